//! Geographic positions and distance
//!
//! Positions are geodetic (degrees, meters above the ellipsoid). Distances are
//! straight-line distances between the ECEF points, the same measure a globe
//! renderer uses between two Cartesian positions.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Meters per degree of latitude (approximate, used for offsets only)
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_320.0;

/// Geodetic position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Height above the ellipsoid in meters
    #[serde(default)]
    pub height: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Interpolate each component independently.
    ///
    /// This is a straight line in lon/lat/height space, not a great circle.
    /// Good enough over the short distances entities transit.
    pub fn lerp(&self, to: &Position, t: f64) -> Position {
        Position {
            longitude: lerp(self.longitude, to.longitude, t),
            latitude: lerp(self.latitude, to.latitude, t),
            height: lerp(self.height, to.height, t),
        }
    }

    /// Earth-centered, earth-fixed coordinates in meters
    pub fn to_ecef(&self) -> Vector3<f64> {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let n = WGS84_A / (1.0 - e2 * lat.sin().powi(2)).sqrt();

        Vector3::new(
            (n + self.height) * lat.cos() * lon.cos(),
            (n + self.height) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + self.height) * lat.sin(),
        )
    }

    /// Position offset to the north by roughly `meters`
    pub fn offset_north(&self, meters: f64) -> Position {
        Position {
            latitude: self.latitude + meters / METERS_PER_DEGREE_LATITUDE,
            ..*self
        }
    }
}

/// Linear interpolation
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Distance capability of the host
pub trait GeoMath {
    /// Distance in meters between two positions
    fn distance(&self, a: &Position, b: &Position) -> f64;
}

/// Straight-line distance on the WGS84 ellipsoid
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84;

impl GeoMath for Wgs84 {
    fn distance(&self, a: &Position, b: &Position) -> f64 {
        (a.to_ecef() - b.to_ecef()).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_components() {
        let a = Position::new(10.0, 50.0, 0.0);
        let b = Position::new(12.0, 54.0, 100.0);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid, Position::new(11.0, 52.0, 50.0));
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_ecef_equator() {
        let p = Position::new(0.0, 0.0, 0.0).to_ecef();
        assert!((p.x - WGS84_A).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(0.0, 1.0, 0.0);
        let d = Wgs84.distance(&a, &b);
        // One degree of latitude at the equator is ~110.57 km
        assert!((d - 110_570.0).abs() < 100.0, "distance {}", d);
    }

    #[test]
    fn test_offset_north() {
        let a = Position::new(4.0, 52.0, 0.0);
        let b = a.offset_north(1000.0);
        let d = Wgs84.distance(&a, &b);
        assert!((d - 1000.0).abs() < 10.0, "distance {}", d);
    }

    #[test]
    fn test_height_contributes() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(0.0, 0.0, 250.0);
        assert!((Wgs84.distance(&a, &b) - 250.0).abs() < 1e-6);
    }
}
