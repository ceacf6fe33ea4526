pub mod animation;
pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod geo;
pub mod map;
pub mod mission;
pub mod report;
pub mod ui;
