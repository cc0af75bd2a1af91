//! Planar geometry and unit conversion for geofence checks.

/// Feet per meter.
pub const FEET_PER_METER: f64 = 3.28084;

/// Convert meters to feet.
///
/// This is the only unit boundary in the pipeline: ingested altitudes are
/// meters, zone altitude bands are feet, and every band comparison happens
/// in feet.
pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

/// Convert feet to meters.
pub fn feet_to_meters(feet: f64) -> f64 {
    feet / FEET_PER_METER
}

/// Check if a point lies inside a polygon using ray casting.
///
/// Coordinates are treated as planar: longitude is x, latitude is y. The
/// polygon ring is closed implicitly (last vertex connects to the first).
///
/// # Arguments
/// * `lng`, `lat` - Test point in decimal degrees
/// * `polygon` - Vertices as `[lat, lon]` pairs
///
/// # Returns
/// true if the point is inside. Polygons with fewer than 3 vertices never
/// contain anything. Points exactly on an edge or vertex may land on either
/// side; boundary inclusion is not guaranteed.
pub fn point_in_polygon(lng: f64, lat: f64, polygon: &[[f64; 2]]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut prev = polygon[polygon.len() - 1];

    for &vertex in polygon {
        let [p1y, p1x] = prev;
        let [p2y, p2x] = vertex;

        // Horizontal edges (p1y == p2y) can never satisfy the strict lower bound.
        if lat > p1y.min(p2y) && lat <= p1y.max(p2y) && lng <= p1x.max(p2x) && p1y != p2y {
            let x_intersect = (lat - p1y) * (p2x - p1x) / (p2y - p1y) + p1x;
            if p1x == p2x || lng <= x_intersect {
                inside = !inside;
            }
        }

        prev = vertex;
    }

    inside
}

/// Arithmetic mean of the polygon vertices as (lat, lon).
///
/// Not the area centroid; it only needs to land somewhere representative for
/// cell indexing.
pub fn centroid(polygon: &[[f64; 2]]) -> Option<(f64, f64)> {
    if polygon.is_empty() {
        return None;
    }
    let n = polygon.len() as f64;
    let (sum_lat, sum_lon) = polygon
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p[0], lon + p[1]));
    Some((sum_lat / n, sum_lon / n))
}
