use glam::DVec3;

/// Convert lon/lat (degrees) to a unit sphere vector.
#[inline(always)]
pub fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    let lon_rad = lon.to_radians();
    let lat_rad = lat.to_radians();
    DVec3::new(
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    )
}

#[inline(always)]
fn vec3_to_lonlat(p: DVec3) -> (f64, f64) {
    let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = p.y.atan2(p.x).to_degrees();
    (lon, lat)
}

/// Great-circle angular distance in radians.
///
/// Uses `atan2(|a×b|, a·b)` so that both very short and near-antipodal
/// arcs stay accurate.
pub fn angular_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let a = lonlat_to_vec3(from.0, from.1);
    let b = lonlat_to_vec3(to.0, to.1);
    a.cross(b).length().atan2(a.dot(b))
}

/// Unit vector perpendicular to `a`, pointing along the arc towards `b`.
/// Antipodal endpoints have no unique arc; the meridian route is taken.
fn arc_heading(a: DVec3, b: DVec3) -> DVec3 {
    let towards = b - a * a.dot(b);
    if towards.length_squared() > 1e-20 {
        return towards.normalize();
    }
    let side = if a.z.abs() < 0.9 { DVec3::Z } else { DVec3::X };
    a.cross(side).cross(a).normalize()
}

/// Point at fraction `t` (0..=1) along the great circle from `from` to `to`.
pub fn interpolate(from: (f64, f64), to: (f64, f64), t: f64) -> (f64, f64) {
    let a = lonlat_to_vec3(from.0, from.1);
    let b = lonlat_to_vec3(to.0, to.1);
    let angle = a.cross(b).length().atan2(a.dot(b));
    if angle < 1e-10 {
        return from;
    }

    let theta = t.clamp(0.0, 1.0) * angle;
    vec3_to_lonlat(a * theta.cos() + arc_heading(a, b) * theta.sin())
}

/// Interpolate along a great circle arc and call a visitor for each subdivision point.
/// Subdivides adaptively: ~2° segments for smooth curves at braille resolution.
/// The start point is not emitted; the end point always is.
#[inline]
pub fn walk_great_circle(from: (f64, f64), to: (f64, f64), mut visitor: impl FnMut(f64, f64)) {
    let a = lonlat_to_vec3(from.0, from.1);
    let b = lonlat_to_vec3(to.0, to.1);
    let angle = a.cross(b).length().atan2(a.dot(b));

    let steps = ((angle.to_degrees() / 2.0).ceil() as usize).max(1);
    if steps == 1 {
        visitor(to.0, to.1);
        return;
    }

    let heading = arc_heading(a, b);
    for i in 1..steps {
        let theta = i as f64 / steps as f64 * angle;
        let (lon, lat) = vec3_to_lonlat(a * theta.cos() + heading * theta.sin());
        visitor(lon, lat);
    }
    visitor(to.0, to.1);
}

/// Coarse grid-sector name for a coordinate, e.g. `SECTOR 38N-78W`.
pub fn sector_label(lon: f64, lat: f64) -> String {
    let lat_zone = if lat > 0.0 { 'N' } else { 'S' };
    let lon_zone = if lon > 0.0 { 'E' } else { 'W' };
    format!(
        "SECTOR {}{}-{}{}",
        lat.floor().abs() as i64,
        lat_zone,
        lon.floor().abs() as i64,
        lon_zone
    )
}
