//! Spherical geometry helpers shared by the spatial conditions.

use crate::event::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let hav = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    2.0 * EARTH_RADIUS_M * hav.sqrt().atan2((1.0 - hav).sqrt())
}

/// Even-odd ray casting over the ordered vertex list.
///
/// The ray is cast along latitude; edges are closed implicitly (last vertex
/// connects back to the first). Fewer than three vertices never contain a point.
pub fn point_in_polygon(point: GeoPoint, polygon: &[GeoPoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.lon > point.lon) != (pj.lon > point.lon)
            && point.lat < (pj.lat - pi.lat) * (point.lon - pi.lon) / (pj.lon - pi.lon) + pi.lat
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(22.1, 114.1),
            GeoPoint::new(22.1, 114.2),
            GeoPoint::new(22.2, 114.2),
            GeoPoint::new(22.2, 114.1),
        ]
    }

    #[test]
    fn distance_same_point_is_zero() {
        let p = GeoPoint::new(22.15, 114.15);
        assert!(distance_meters(p, p).abs() < 1e-9);
    }

    #[test]
    fn distance_one_degree_latitude() {
        let d = distance_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        // 2*pi*R/360
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn polygon_contains_interior_point() {
        assert!(point_in_polygon(GeoPoint::new(22.15, 114.15), &square()));
    }

    #[test]
    fn polygon_excludes_exterior_point() {
        assert!(!point_in_polygon(GeoPoint::new(22.25, 114.15), &square()));
        assert!(!point_in_polygon(GeoPoint::new(22.15, 114.05), &square()));
    }

    #[test]
    fn concave_polygon_even_odd() {
        // U shape opening north; the notch is outside.
        let u = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 3.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(3.0, 2.0),
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(3.0, 1.0),
            GeoPoint::new(3.0, 0.0),
        ];
        assert!(point_in_polygon(GeoPoint::new(2.0, 0.5), &u));
        assert!(!point_in_polygon(GeoPoint::new(2.0, 1.5), &u));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)];
        assert!(!point_in_polygon(GeoPoint::new(0.5, 0.5), &line));
    }
}
