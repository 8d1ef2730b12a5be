use serde::Serialize;

use crate::observer::error::GeometryError;
use crate::observer::ground_station::GroundObserver;

/// Look angles of a satellite from the observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// Elevation, azimuth and slant range of an Earth-fixed position, using the
/// geodetic local tangent plane at the observer.
pub fn observe(
    ground_position: [f64; 3],
    observer: &GroundObserver,
) -> Result<Observation, GeometryError> {
    let (dr, range_km) = line_of_sight(ground_position, observer)?;
    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    Ok(Observation {
        elevation_deg: (up / range_km).clamp(-1.0, 1.0).asin().to_degrees(),
        azimuth_deg: east.atan2(north).to_degrees().rem_euclid(360.0),
        range_km,
    })
}

/// Rate of change of the slant range (km/s, positive when receding).
pub fn range_rate(
    ground_position: [f64; 3],
    ground_velocity: [f64; 3],
    observer: &GroundObserver,
) -> Result<f64, GeometryError> {
    let (dr, range_km) = line_of_sight(ground_position, observer)?;
    // the site is at rest in the Earth-fixed frame
    Ok((0..3).map(|k| ground_velocity[k] * dr[k] / range_km).sum())
}

fn line_of_sight(
    ground_position: [f64; 3],
    observer: &GroundObserver,
) -> Result<([f64; 3], f64), GeometryError> {
    let site = observer.position_ecef_km();
    let dr = [
        ground_position[0] - site[0],
        ground_position[1] - site[1],
        ground_position[2] - site[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
    if !(range_km > 0.0) {
        return Err(GeometryError::Degenerate { range_km });
    }
    Ok((dr, range_km))
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn site(lat: f64, lon: f64) -> GroundObserver {
        GroundObserver {
            latitude_deg: lat,
            longitude_deg: lon,
            ..Default::default()
        }
    }

    #[test]
    fn overhead_point_is_at_zenith() {
        let observer = site(0.0, 0.0);
        let obs = observe([6378.137 + 550.0, 0.0, 0.0], &observer).unwrap();
        assert_relative_eq!(obs.elevation_deg, 90.0, epsilon = 1e-9);
        assert_relative_eq!(obs.range_km, 550.0, epsilon = 1e-9);
    }

    #[test]
    fn azimuth_points_north_and_east() {
        let observer = site(0.0, 0.0);
        let north = observe([6378.137, 0.0, 500.0], &observer).unwrap();
        assert_relative_eq!(north.azimuth_deg, 0.0, epsilon = 1e-9);
        let east = observe([6378.137, 500.0, 0.0], &observer).unwrap();
        assert_relative_eq!(east.azimuth_deg, 90.0, epsilon = 1e-9);
        assert!(east.elevation_deg.abs() < 1e-9);
    }

    #[test]
    fn mid_latitude_zenith_follows_geodetic_normal() {
        // Straight up along the ellipsoid normal, not the geocentric radius.
        let observer = site(45.0, 30.0);
        let p = observer.position_ecef_km();
        let (lat, lon) = (observer.lat_rad(), observer.lon_rad());
        let normal = [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()];
        let sat = [
            p[0] + 800.0 * normal[0],
            p[1] + 800.0 * normal[1],
            p[2] + 800.0 * normal[2],
        ];
        let obs = observe(sat, &observer).unwrap();
        assert_relative_eq!(obs.elevation_deg, 90.0, epsilon = 1e-6);

        let geocentric = {
            let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            [p[0] / r, p[1] / r, p[2] / r]
        };
        let sat = [
            p[0] + 800.0 * geocentric[0],
            p[1] + 800.0 * geocentric[1],
            p[2] + 800.0 * geocentric[2],
        ];
        let obs = observe(sat, &observer).unwrap();
        assert!(obs.elevation_deg < 89.9, "{}", obs.elevation_deg);
    }

    #[test]
    fn zero_range_is_degenerate() {
        let observer = site(10.0, 20.0);
        let err = observe(observer.position_ecef_km(), &observer).unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { .. }));
    }

    #[test]
    fn receding_satellite_has_positive_range_rate() {
        let observer = site(0.0, 0.0);
        let rate = range_rate([7000.0, 0.0, 0.0], [1.0, 0.0, 0.0], &observer).unwrap();
        assert_relative_eq!(rate, 1.0, epsilon = 1e-12);
    }
}
