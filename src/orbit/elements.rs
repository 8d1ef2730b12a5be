use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::orbit::constants::{EARTH_RADIUS_KM, J2, MU_EARTH_KM3_S2, SECONDS_PER_DAY};
use crate::orbit::error::OrbitError;

/// Six classical (mean) orbital elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassicalElements {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
}

/// How an element set is propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationModel {
    /// Pure two-body motion.
    TwoBody,
    /// Two-body motion with J2 secular drift of RAAN, perigee and mean motion.
    #[default]
    J2Secular,
    /// SGP4, for element sets that came from TLEs.
    Sgp4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElementSet {
    pub id: String,
    pub constellation: String,
    pub epoch: DateTime<Utc>,
    #[serde(flatten)]
    pub elements: ClassicalElements,
    /// SGP4 B* drag term (1/earth radii); ignored by the analytic models.
    #[serde(default)]
    pub drag_term: f64,
    #[serde(default)]
    pub model: PropagationModel,
}

/// Secular rates under J2 (rad/s).
#[derive(Debug, Clone, Copy)]
pub struct SecularRates {
    pub raan: f64,
    pub arg_perigee: f64,
    pub mean_motion: f64,
}

impl ClassicalElements {
    pub fn validate(&self, id: &str) -> Result<(), OrbitError> {
        let values = [
            self.semi_major_axis_km,
            self.eccentricity,
            self.inclination_deg,
            self.raan_deg,
            self.arg_perigee_deg,
            self.mean_anomaly_deg,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OrbitError::invalid(id, "non-finite element value"));
        }
        if self.semi_major_axis_km <= 0.0 {
            return Err(OrbitError::invalid(
                id,
                format!("semi-major axis must be positive ({})", self.semi_major_axis_km),
            ));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(OrbitError::invalid(
                id,
                format!("eccentricity must be in [0, 1) ({})", self.eccentricity),
            ));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(OrbitError::invalid(
                id,
                format!("inclination must be in [0, 180] deg ({})", self.inclination_deg),
            ));
        }
        Ok(())
    }

    /// Unperturbed mean motion (rad/s).
    pub fn mean_motion_rad_s(&self) -> f64 {
        (MU_EARTH_KM3_S2 / self.semi_major_axis_km.powi(3)).sqrt()
    }

    pub fn period_s(&self) -> f64 {
        TAU / self.mean_motion_rad_s()
    }

    /// Mean motion in revolutions per day, the unit TLEs use.
    pub fn mean_motion_rev_day(&self) -> f64 {
        self.mean_motion_rad_s() * SECONDS_PER_DAY / TAU
    }

    /// Semi-major axis matching a mean motion given in revolutions per day.
    pub fn semi_major_axis_from_rev_day(rev_day: f64) -> f64 {
        let n = rev_day * TAU / SECONDS_PER_DAY;
        (MU_EARTH_KM3_S2 / (n * n)).cbrt()
    }

    pub fn secular_rates(&self) -> SecularRates {
        let n0 = self.mean_motion_rad_s();
        let e2 = self.eccentricity * self.eccentricity;
        let p = self.semi_major_axis_km * (1.0 - e2);
        let k = 1.5 * J2 * (EARTH_RADIUS_KM / p).powi(2);
        let (sin_i, cos_i) = self.inclination_deg.to_radians().sin_cos();
        let sin2_i = sin_i * sin_i;
        SecularRates {
            raan: -k * n0 * cos_i,
            arg_perigee: k * n0 * (2.0 - 2.5 * sin2_i),
            mean_motion: n0 * (1.0 + k * (1.0 - e2).sqrt() * (1.0 - 1.5 * sin2_i)),
        }
    }
}

impl OrbitalElementSet {
    pub fn validate(&self) -> Result<(), OrbitError> {
        if self.id.trim().is_empty() {
            return Err(OrbitError::invalid(&self.id, "empty identifier"));
        }
        self.elements.validate(&self.id)
    }

    /// Seconds between the element epoch and `time`.
    pub fn offset_at(&self, time: DateTime<Utc>) -> f64 {
        (time - self.epoch)
            .num_microseconds()
            .map(|us| us as f64 * 1e-6)
            .unwrap_or_else(|| (time - self.epoch).num_milliseconds() as f64 * 1e-3)
    }

    /// RAAN and mean anomaly (degrees, wrapped to [0, 360)) after `offset_s`
    /// seconds of secular drift. Used as the orbital phase of a satellite.
    pub fn phase_at(&self, offset_s: f64) -> (f64, f64) {
        let el = &self.elements;
        let (raan_rate, ma_rate) = match self.model {
            PropagationModel::TwoBody => (0.0, el.mean_motion_rad_s()),
            PropagationModel::J2Secular | PropagationModel::Sgp4 => {
                let rates = el.secular_rates();
                (rates.raan, rates.mean_motion)
            }
        };
        let raan = el.raan_deg + (raan_rate * offset_s).to_degrees();
        let ma = el.mean_anomaly_deg + (ma_rate * offset_s).to_degrees();
        (raan.rem_euclid(360.0), ma.rem_euclid(360.0))
    }
}
