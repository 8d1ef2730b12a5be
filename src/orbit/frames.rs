use chrono::{DateTime, Utc};

use crate::orbit::constants::{EARTH_ROTATION_RAD_S, SECONDS_PER_JULIAN_YEAR};

/// Greenwich mean sidereal angle (rad) at `offset_s` seconds after `epoch`.
///
/// The offset is added in Julian years rather than by shifting the
/// timestamp so sub-microsecond offsets survive.
pub fn sidereal_angle(epoch: DateTime<Utc>, offset_s: f64) -> f64 {
    let years =
        sgp4::julian_years_since_j2000(&epoch.naive_utc()) + offset_s / SECONDS_PER_JULIAN_YEAR;
    sgp4::iau_epoch_to_sidereal_time(years)
}

/// Rotates an inertial (TEME) position into the Earth-fixed frame.
pub fn to_ground_frame(position: [f64; 3], epoch: DateTime<Utc>, offset_s: f64) -> [f64; 3] {
    teme_to_ecef_position(position, sidereal_angle(epoch, offset_s))
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = teme_to_ecef_position(vel_teme, gmst);
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}
