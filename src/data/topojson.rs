use std::collections::HashMap;

use rayon::prelude::*;
use serde::Deserialize;

use super::DataError;
use crate::map::LineString;

#[derive(Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    objects: HashMap<String, TopoGeometry>,
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Deserialize, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection { geometries: Vec<TopoGeometry> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    #[serde(other)]
    Unsupported,
}

/// Decode the named object of a TopoJSON document (a `world-atlas`
/// topology) into outline rings and lines.
/// The buffer is parsed in place and left scrambled.
pub fn decode(bytes: &mut [u8], object: &str) -> Result<Vec<LineString>, DataError> {
    let topology: Topology = simd_json::serde::from_slice(bytes)?;

    let transform = topology.transform;
    let arcs: Vec<LineString> = topology
        .arcs
        .par_iter()
        .map(|arc| decode_arc(arc, transform))
        .collect();

    let geometry = topology
        .objects
        .get(object)
        .ok_or_else(|| DataError::MissingObject(object.to_string()))?;

    let mut lines = Vec::new();
    collect_lines(geometry, &arcs, &mut lines);
    Ok(lines)
}

/// Undo delta encoding and quantization for one arc
fn decode_arc(arc: &[Vec<f64>], transform: Option<Transform>) -> LineString {
    let points = arc.iter().filter(|p| p.len() >= 2);
    match transform {
        Some(t) => {
            let (mut x, mut y) = (0.0, 0.0);
            points
                .map(|p| {
                    x += p[0];
                    y += p[1];
                    (x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                })
                .collect()
        }
        None => points.map(|p| (p[0], p[1])).collect(),
    }
}

/// Join arcs by index into one line. A negative index `i` means arc `!i`
/// reversed. Shared endpoints between consecutive arcs are emitted once.
fn stitch(indices: &[i64], arcs: &[LineString]) -> LineString {
    let mut line: LineString = Vec::new();
    for &index in indices {
        let (idx, reversed) = if index >= 0 {
            (index as usize, false)
        } else {
            (!index as usize, true)
        };
        let Some(arc) = arcs.get(idx) else {
            continue;
        };

        let skip = usize::from(!line.is_empty());
        if reversed {
            line.extend(arc.iter().rev().skip(skip));
        } else {
            line.extend(arc.iter().skip(skip));
        }
    }
    line
}

fn collect_lines(geometry: &TopoGeometry, arcs: &[LineString], out: &mut Vec<LineString>) {
    if let TopoGeometry::GeometryCollection { geometries } = geometry {
        for g in geometries {
            collect_lines(g, arcs, out);
        }
        return;
    }

    // Degenerate rings are dropped
    let mut push = |line: LineString| {
        if line.len() >= 2 {
            out.push(line);
        }
    };
    match geometry {
        TopoGeometry::Polygon { arcs: rings } => {
            for ring in rings {
                push(stitch(ring, arcs));
            }
        }
        TopoGeometry::MultiPolygon { arcs: polygons } => {
            for ring in polygons.iter().flatten() {
                push(stitch(ring, arcs));
            }
        }
        TopoGeometry::LineString { arcs: indices } => push(stitch(indices, arcs)),
        TopoGeometry::MultiLineString { arcs: lines } => {
            for indices in lines {
                push(stitch(indices, arcs));
            }
        }
        TopoGeometry::GeometryCollection { .. } | TopoGeometry::Unsupported => {}
    }
}
