//! Geodesy primitives shared by the query layer and the API.
//!
//! Distances are spherical (haversine) in meters; WGS84 coordinates, no
//! ellipsoidal correction. The same formula is mirrored in SQL by the db
//! crate and the two must agree within a small epsilon.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Platform-wide cap on a caller-supplied search radius.
pub const MAX_SEARCH_RADIUS_METERS: f64 = 50_000.0;

/// Search radius applied when the caller does not supply one.
pub const DEFAULT_SEARCH_RADIUS_METERS: f64 = 5_000.0;

/// Approximate meters per degree of latitude, used for bounding-box
/// prefilters only — the haversine predicate is authoritative.
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// A validated WGS84 point. Construction rejects out-of-range and
/// non-finite values, so a `GeoPoint` in hand is always usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidCoordinate`] if latitude is outside
    /// [-90, 90], longitude is outside [-180, 180], or either is NaN.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        // NaN fails both range checks, so non-finite input is rejected here too.
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two points in meters (haversine, `atan2` form).
#[must_use]
pub fn haversine_distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// A latitude/longitude rectangle used to prefilter candidate rows so the
/// merchants coordinate index can narrow the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box around `center` covering at least `radius_meters` in every
    /// direction. Padded 10% so the box never excludes a point the exact
    /// haversine filter would accept; near the poles the longitude span
    /// widens to the full range. Does not wrap the antimeridian — points
    /// across it fall outside the box.
    #[must_use]
    pub fn around(center: GeoPoint, radius_meters: f64) -> Self {
        let padded = radius_meters * 1.1;
        let lat_delta = padded / METERS_PER_DEGREE_LAT;

        let cos_lat = center.latitude.to_radians().cos().abs();
        let lon_delta = if cos_lat < 1e-6 {
            360.0
        } else {
            padded / (METERS_PER_DEGREE_LAT * cos_lat)
        };

        Self {
            min_lat: (center.latitude - lat_delta).max(-90.0),
            max_lat: (center.latitude + lat_delta).min(90.0),
            min_lon: (center.longitude - lon_delta).max(-180.0),
            max_lon: (center.longitude + lon_delta).min(180.0),
        }
    }

    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }
}

/// A merchant-defined service-area polygon: a single closed ring of
/// `[latitude, longitude]` vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArea {
    ring: Vec<GeoPoint>,
}

impl ServiceArea {
    /// Build from the canonical JSONB shape: an array of `[lat, lon]`
    /// pairs with at least 3 vertices. Any other shape, a short ring, or
    /// an out-of-range vertex is rejected — malformed polygons are never
    /// silently reinterpreted.
    ///
    /// # Errors
    ///
    /// Returns a description of the rejected shape.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        let pairs: Vec<[f64; 2]> = serde_json::from_value(value.clone())
            .map_err(|e| format!("service_area is not an array of [lat, lon] pairs: {e}"))?;
        if pairs.len() < 3 {
            return Err(format!(
                "service_area ring has {} vertices, need at least 3",
                pairs.len()
            ));
        }
        let ring = pairs
            .into_iter()
            .map(|[lat, lon]| {
                GeoPoint::new(lat, lon).map_err(|e| format!("service_area vertex: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ring })
    }

    /// Ray-casting point-in-polygon test. Points on an edge may land on
    /// either side; delivery boundaries are hundreds of meters wide in
    /// practice, so edge behavior is not load-bearing.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        let mut inside = false;
        let n = self.ring.len();
        let mut j = n - 1;
        for i in 0..n {
            let a = self.ring[i];
            let b = self.ring[j];
            let crosses = (a.latitude > point.latitude) != (b.latitude > point.latitude);
            if crosses {
                let t = (point.latitude - a.latitude) / (b.latitude - a.latitude);
                let lon_at = a.longitude + t * (b.longitude - a.longitude);
                if point.longitude < lon_at {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).expect("valid test point")
    }

    #[test]
    fn geo_point_accepts_boundary_values() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(90.01, 0.0).is_err());
        assert!(GeoPoint::new(-91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 180.5).is_err());
        assert!(GeoPoint::new(0.0, -200.0).is_err());
    }

    #[test]
    fn geo_point_rejects_nan() {
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::NAN).is_err());
        assert!(GeoPoint::new(f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        let manila = point(14.5995, 121.0244);
        assert!(haversine_distance_meters(manila, manila) < 1e-6);
    }

    #[test]
    fn haversine_manila_to_makati() {
        // Manila City Hall to Makati CBD, roughly 5.6 km.
        let manila = point(14.5896, 120.9816);
        let makati = point(14.5547, 121.0244);
        let d = haversine_distance_meters(manila, makati);
        assert!(
            (5_000.0..7_000.0).contains(&d),
            "expected ~5.6km, got {d}m"
        );
    }

    #[test]
    fn haversine_london_to_paris() {
        let london = point(51.5074, -0.1278);
        let paris = point(48.8566, 2.3522);
        let d = haversine_distance_meters(london, paris);
        assert!(
            (d - 344_000.0).abs() < 10_000.0,
            "expected ~344km, got {d}m"
        );
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = point(14.58, 121.02);
        let b = point(14.65, 120.98);
        let there = haversine_distance_meters(a, b);
        let back = haversine_distance_meters(b, a);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_contains_all_points_within_radius() {
        let center = point(14.5995, 121.0244);
        let bbox = BoundingBox::around(center, 10_000.0);

        // Walk the circle boundary in several directions; every point at
        // exactly the radius must be inside the (padded) box.
        for bearing_deg in [0.0_f64, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0] {
            let bearing = bearing_deg.to_radians();
            let lat = center.latitude + (10_000.0 / 111_320.0) * bearing.cos();
            let lon = center.longitude
                + (10_000.0 / (111_320.0 * center.latitude.to_radians().cos())) * bearing.sin();
            let edge = point(lat, lon);
            assert!(
                bbox.contains(edge),
                "bearing {bearing_deg}: {edge:?} escaped {bbox:?}"
            );
        }
    }

    #[test]
    fn bounding_box_clamps_to_valid_ranges() {
        let near_pole = point(89.9, 0.0);
        let bbox = BoundingBox::around(near_pole, 50_000.0);
        assert!(bbox.max_lat <= 90.0);
        assert!(bbox.min_lon >= -180.0 && bbox.max_lon <= 180.0);
    }

    #[test]
    fn service_area_parses_canonical_shape() {
        let value = serde_json::json!([[14.55, 121.00], [14.65, 121.00], [14.60, 121.10]]);
        let area = ServiceArea::from_json(&value).expect("canonical ring parses");
        assert!(area.contains(point(14.60, 121.03)));
        assert!(!area.contains(point(14.60, 121.20)));
    }

    #[test]
    fn service_area_rejects_short_ring() {
        let value = serde_json::json!([[14.55, 121.00], [14.65, 121.00]]);
        assert!(ServiceArea::from_json(&value).is_err());
    }

    #[test]
    fn service_area_rejects_non_array_shapes() {
        assert!(ServiceArea::from_json(&serde_json::json!({"ring": []})).is_err());
        assert!(ServiceArea::from_json(&serde_json::json!("polygon")).is_err());
        assert!(ServiceArea::from_json(&serde_json::json!([[200.0, 0.0], [0.0, 0.0], [1.0, 1.0]]))
            .is_err());
    }

    #[test]
    fn service_area_containment_square() {
        let value = serde_json::json!([
            [14.50, 120.90],
            [14.70, 120.90],
            [14.70, 121.10],
            [14.50, 121.10]
        ]);
        let area = ServiceArea::from_json(&value).expect("square parses");
        assert!(area.contains(point(14.60, 121.00)));
        assert!(!area.contains(point(14.75, 121.00)));
        assert!(!area.contains(point(14.60, 121.15)));
    }
}
