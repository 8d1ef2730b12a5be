/// Earth gravitational parameter (km³/s²), WGS-84
pub const MU_EARTH_KM3_S2: f64 = 398_600.4418;

/// Earth equatorial radius (km), WGS-84
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// First eccentricity squared of the WGS-84 ellipsoid
pub const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Second zonal harmonic
pub const J2: f64 = 1.082_626_68e-3;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

pub const SECONDS_PER_JULIAN_YEAR: f64 = 365.25 * SECONDS_PER_DAY;
