use serde::{Deserialize, Serialize};

use crate::config::ObserverConfig;
use crate::orbit::constants::{EARTH_RADIUS_KM, WGS84_E2};

/// Fixed ground observer on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundObserver {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub min_elevation_deg: f64,
}

impl Default for GroundObserver {
    fn default() -> Self {
        Self {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_m: 0.0,
            min_elevation_deg: 0.0,
        }
    }
}

impl From<ObserverConfig> for GroundObserver {
    fn from(config: ObserverConfig) -> Self {
        Self {
            latitude_deg: config.latitude_deg,
            longitude_deg: config.longitude_deg,
            altitude_m: config.altitude_m,
            min_elevation_deg: 0.0,
        }
    }
}

impl GroundObserver {
    /// Parses `"lat, lon"` as used on the command line.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let latitude_deg: f64 = parts[0].parse().ok()?;
        let longitude_deg: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return None;
        }
        Some(Self {
            latitude_deg,
            longitude_deg,
            altitude_m: altitude_m.unwrap_or(0.0),
            min_elevation_deg: 0.0,
        })
    }

    /// Same location, constellation-specific elevation mask.
    pub fn with_min_elevation(self, min_elevation_deg: f64) -> Self {
        Self {
            min_elevation_deg,
            ..self
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = self.lon_rad().sin_cos();
        // prime vertical radius of curvature
        let n = EARTH_RADIUS_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * cos_lon,
            (n + alt_km) * cos_lat * sin_lon,
            (n * (1.0 - WGS84_E2) + alt_km) * sin_lat,
        ]
    }

    pub fn is_visible(&self, elevation_deg: f64) -> bool {
        elevation_deg >= self.min_elevation_deg
    }
}
