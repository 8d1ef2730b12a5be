use std::f64::consts::{PI, TAU};

use crate::orbit::constants::{EARTH_RADIUS_KM, MU_EARTH_KM3_S2};
use crate::orbit::elements::{ClassicalElements, OrbitalElementSet, PropagationModel};
use crate::orbit::error::OrbitError;

const KEPLER_TOLERANCE: f64 = 1e-12;
const KEPLER_MAX_ITER: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

impl StateVector {
    pub fn radius_km(&self) -> f64 {
        let p = self.position;
        (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
    }
}

enum Model {
    Analytic { j2: bool },
    Sgp4(Box<sgp4::Constants>),
}

/// Propagator bound to one validated element set.
pub struct OrbitalPropagator<'a> {
    set: &'a OrbitalElementSet,
    model: Model,
}

/// One-shot propagation; prefer [`OrbitalPropagator`] when sampling a
/// timeline so SGP4 constants are only initialised once.
pub fn propagate(set: &OrbitalElementSet, offset_s: f64) -> Result<StateVector, OrbitError> {
    OrbitalPropagator::new(set)?.propagate(offset_s)
}

impl<'a> OrbitalPropagator<'a> {
    pub fn new(set: &'a OrbitalElementSet) -> Result<Self, OrbitError> {
        set.validate()?;
        let model = match set.model {
            PropagationModel::TwoBody => Model::Analytic { j2: false },
            PropagationModel::J2Secular => Model::Analytic { j2: true },
            PropagationModel::Sgp4 => Model::Sgp4(Box::new(sgp4_constants(set)?)),
        };
        Ok(Self { set, model })
    }

    pub fn element_set(&self) -> &OrbitalElementSet {
        self.set
    }

    /// Fails when the model breaks down or the position lies inside the
    /// Earth (a decayed or sub-surface trajectory).
    pub fn propagate(&self, offset_s: f64) -> Result<StateVector, OrbitError> {
        let state = match &self.model {
            Model::Analytic { j2 } => propagate_analytic(&self.set.elements, offset_s, *j2),
            Model::Sgp4(constants) => {
                let prediction = constants
                    .propagate(sgp4::MinutesSinceEpoch(offset_s / 60.0))
                    .map_err(|e| OrbitError::propagation(&self.set.id, e))?;
                StateVector {
                    position: prediction.position,
                    velocity: prediction.velocity,
                }
            }
        };
        let radius = state.radius_km();
        if radius.is_nan() || radius < EARTH_RADIUS_KM {
            return Err(OrbitError::propagation(
                &self.set.id,
                format!("position below the Earth's surface (r = {radius:.1} km)"),
            ));
        }
        Ok(state)
    }
}

fn sgp4_constants(set: &OrbitalElementSet) -> Result<sgp4::Constants, OrbitError> {
    let el = &set.elements;
    let orbit = sgp4::Orbit::from_kozai_elements(
        &sgp4::WGS84,
        el.inclination_deg.to_radians(),
        el.raan_deg.to_radians(),
        el.eccentricity,
        el.arg_perigee_deg.to_radians(),
        el.mean_anomaly_deg.to_radians(),
        // rad/min
        el.mean_motion_rad_s() * 60.0,
    )
    .map_err(|e| OrbitError::invalid(&set.id, e.to_string()))?;

    sgp4::Constants::new(
        sgp4::WGS84,
        sgp4::iau_epoch_to_sidereal_time,
        sgp4::julian_years_since_j2000(&set.epoch.naive_utc()),
        set.drag_term,
        orbit,
    )
    .map_err(|e| OrbitError::invalid(&set.id, e.to_string()))
}

fn propagate_analytic(el: &ClassicalElements, offset_s: f64, j2: bool) -> StateVector {
    let (raan, argp, n) = if j2 {
        let rates = el.secular_rates();
        (
            el.raan_deg.to_radians() + rates.raan * offset_s,
            el.arg_perigee_deg.to_radians() + rates.arg_perigee * offset_s,
            rates.mean_motion,
        )
    } else {
        (
            el.raan_deg.to_radians(),
            el.arg_perigee_deg.to_radians(),
            el.mean_motion_rad_s(),
        )
    };
    let mean_anomaly = (el.mean_anomaly_deg.to_radians() + n * offset_s).rem_euclid(TAU);
    let nu = true_anomaly(mean_anomaly, el.eccentricity);
    perifocal_to_inertial(
        el.semi_major_axis_km,
        el.eccentricity,
        el.inclination_deg.to_radians(),
        raan,
        argp,
        nu,
    )
}

/// Newton iteration on Kepler's equation `E - e sin E = M`.
pub fn eccentric_anomaly(mean_anomaly: f64, e: f64) -> f64 {
    let m = mean_anomaly.rem_euclid(TAU);
    let mut ea = if e < 0.8 { m } else { PI };
    for _ in 0..KEPLER_MAX_ITER {
        let f = ea - e * ea.sin() - m;
        let step = f / (1.0 - e * ea.cos());
        ea -= step;
        if step.abs() < KEPLER_TOLERANCE {
            break;
        }
    }
    ea
}

pub fn true_anomaly(mean_anomaly: f64, e: f64) -> f64 {
    let ea = eccentric_anomaly(mean_anomaly, e);
    2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos())
}

/// Classical elements (radians) and true anomaly to an inertial state.
pub fn perifocal_to_inertial(a: f64, e: f64, i: f64, raan: f64, argp: f64, nu: f64) -> StateVector {
    let p = a * (1.0 - e * e);
    let r = p / (1.0 + e * nu.cos());
    let r_pqw = [r * nu.cos(), r * nu.sin(), 0.0];
    let v_factor = (MU_EARTH_KM3_S2 / p).sqrt();
    let v_pqw = [-v_factor * nu.sin(), v_factor * (e + nu.cos()), 0.0];

    let (sin_o, cos_o) = raan.sin_cos();
    let (sin_w, cos_w) = argp.sin_cos();
    let (sin_i, cos_i) = i.sin_cos();
    let rot = [
        [
            cos_o * cos_w - sin_o * sin_w * cos_i,
            -cos_o * sin_w - sin_o * cos_w * cos_i,
            sin_o * sin_i,
        ],
        [
            sin_o * cos_w + cos_o * sin_w * cos_i,
            -sin_o * sin_w + cos_o * cos_w * cos_i,
            -cos_o * sin_i,
        ],
        [sin_w * sin_i, cos_w * sin_i, cos_i],
    ];

    let mut position = [0.0; 3];
    let mut velocity = [0.0; 3];
    for row in 0..3 {
        for col in 0..3 {
            position[row] += rot[row][col] * r_pqw[col];
            velocity[row] += rot[row][col] * v_pqw[col];
        }
    }
    StateVector { position, velocity }
}
