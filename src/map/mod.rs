mod geometry;
mod projection;
mod renderer;

pub use projection::Viewport;
pub use renderer::{Label, LabelKind, LineString, MapLayers, MapRenderer, Overlay};
