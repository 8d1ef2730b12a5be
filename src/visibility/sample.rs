use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::observer::Observation;

/// One timestamped look at a satellite from the observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySample {
    pub step_index: usize,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the start of the sampling grid
    pub offset_s: f64,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
    pub range_rate_km_s: f64,
    pub signal_dbm: f64,
    pub visible: bool,
}

impl VisibilitySample {
    /// `visible` is always derived from the elevation mask, never set directly.
    pub fn new(
        step_index: usize,
        timestamp: DateTime<Utc>,
        offset_s: f64,
        observation: Observation,
        range_rate_km_s: f64,
        signal_dbm: f64,
        threshold_deg: f64,
    ) -> Self {
        Self {
            step_index,
            timestamp,
            offset_s,
            elevation_deg: observation.elevation_deg,
            azimuth_deg: observation.azimuth_deg,
            range_km: observation.range_km,
            range_rate_km_s,
            signal_dbm,
            visible: observation.elevation_deg >= threshold_deg,
        }
    }
}
