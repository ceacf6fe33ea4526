mod topojson;

pub use topojson::decode as decode_topojson;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use geojson::{GeoJson, Geometry, Value};
use thiserror::Error;

use crate::map::{LineString, MapRenderer};

/// Local copy of the world-atlas topology, also where downloads are cached
pub const WORLD_TOPOLOGY_FILE: &str = "countries-110m.json";
/// Object inside the topology holding country polygons
pub const WORLD_OBJECT: &str = "countries";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] simd_json::Error),
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("topology has no object named {0:?}")]
    MissingObject(String),
}

/// Load boundaries from the data directory. Prefers the cached world
/// topology, then any GeoJSON files. Returns the number of outlines added.
pub fn load_local(renderer: &mut MapRenderer, data_dir: &Path) -> Result<usize, DataError> {
    let topology_path = data_dir.join(WORLD_TOPOLOGY_FILE);
    if topology_path.exists() {
        let mut bytes = fs::read(&topology_path)?;
        let outlines = decode_topojson(&mut bytes, WORLD_OBJECT)?;
        let count = outlines.len();
        renderer.set_outlines(outlines);
        log::info!("Loaded {} outlines from {}", count, topology_path.display());
        return Ok(count);
    }

    let mut count = 0;
    if data_dir.is_dir() {
        let mut paths: Vec<PathBuf> = fs::read_dir(data_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "geojson"))
            .collect();
        paths.sort();

        for path in paths {
            match load_geojson_outlines(&path) {
                Ok(lines) => {
                    count += lines.len();
                    for line in lines {
                        renderer.add_outline(line);
                    }
                }
                Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
            }
        }
    }
    Ok(count)
}

/// Download the world topology on a background thread.
/// The raw file is cached into `cache_dir` before decoding so later runs stay offline.
pub fn spawn_world_fetch(url: String, cache_dir: PathBuf) -> Receiver<Result<Vec<LineString>, DataError>> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("world-fetch".to_string())
        .spawn(move || {
            let _ = tx.send(fetch_world(&url, &cache_dir));
        });
    if let Err(e) = spawned {
        log::error!("Failed to spawn world fetch: {}", e);
    }
    rx
}

fn fetch_world(url: &str, cache_dir: &Path) -> Result<Vec<LineString>, DataError> {
    log::info!("Fetching world boundaries from {}", url);
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(DataError::Status(response.status()));
    }
    let mut bytes = response.bytes()?.to_vec();

    let cache_path = cache_dir.join(WORLD_TOPOLOGY_FILE);
    if let Err(e) = fs::create_dir_all(cache_dir).and_then(|_| fs::write(&cache_path, &bytes)) {
        log::warn!("Could not cache world boundaries to {}: {}", cache_path.display(), e);
    }

    decode_topojson(&mut bytes, WORLD_OBJECT)
}

/// Read every line/ring from a GeoJSON file
fn load_geojson_outlines(path: &Path) -> Result<Vec<LineString>, DataError> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString {
        coords.iter().filter(|c| c.len() >= 2).map(|c| (c[0], c[1])).collect()
    };
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|c| add_line(to_line(c))),
        // Every ring, holes included: lakes and enclaves are boundaries too
        Value::Polygon(rings) => rings.iter().for_each(|r| add_line(to_line(r))),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .for_each(|r| add_line(to_line(r))),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Coarse continent outlines shown until real boundaries are available
pub fn generate_simple_world(renderer: &mut MapRenderer) {
    let continents: [&[(f64, f64)]; 7] = [
        // North America
        &[
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Southern Africa
        &[
            (-17.0, 15.0), (-15.0, 10.0), (-10.0, 5.0), (0.0, 5.0),
            (10.0, 5.0), (15.0, 0.0), (20.0, -5.0), (25.0, -10.0),
            (35.0, -20.0), (35.0, -25.0), (30.0, -30.0), (20.0, -35.0),
            (18.0, -35.0), (15.0, -30.0), (10.0, -15.0), (10.0, 0.0),
            (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0), (-17.0, 15.0),
        ],
        // Northern Africa
        &[
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (35.0, -5.0), (35.0, -20.0),
        ],
        // Asia
        &[
            (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
            (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
            (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
            (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
            (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
            (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
            (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
            (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
            (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ];

    for outline in continents {
        renderer.add_outline(outline.to_vec());
    }
    renderer.mark_placeholder();
}
