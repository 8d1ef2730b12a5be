use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::visibility::VisibilitySample;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum EventKind {
    /// Neighbor signal above an absolute threshold (A4-like).
    NeighborAboveThreshold,
    /// Serving below one threshold while the neighbor is above another (A5-like).
    ServingDegradedNeighborGood,
    /// Serving far away while the neighbor is close (D2-like).
    DistanceBasedSwitch,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::NeighborAboveThreshold,
        EventKind::ServingDegradedNeighborGood,
        EventKind::DistanceBasedSwitch,
    ];

    pub fn priority(self) -> Priority {
        match self {
            EventKind::ServingDegradedNeighborGood => Priority::High,
            EventKind::NeighborAboveThreshold => Priority::Medium,
            EventKind::DistanceBasedSwitch => Priority::Low,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Ordered so that `High > Medium > Low`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Values of one satellite at the trigger step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub elevation_deg: f64,
    pub range_km: f64,
    pub signal_dbm: f64,
}

impl From<&VisibilitySample> for Measurement {
    fn from(sample: &VisibilitySample) -> Self {
        Self {
            elevation_deg: sample.elevation_deg,
            range_km: sample.range_km,
            signal_dbm: sample.signal_dbm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    pub kind: EventKind,
    pub priority: Priority,
    pub serving_id: String,
    pub neighbor_id: String,
    pub timestamp: DateTime<Utc>,
    pub step_index: usize,
    pub serving: Measurement,
    pub neighbor: Measurement,
}

impl HandoverEvent {
    pub fn new(
        kind: EventKind,
        serving_id: &str,
        neighbor_id: &str,
        serving: &VisibilitySample,
        neighbor: &VisibilitySample,
    ) -> Self {
        Self {
            kind,
            priority: kind.priority(),
            serving_id: serving_id.to_string(),
            neighbor_id: neighbor_id.to_string(),
            timestamp: serving.timestamp,
            step_index: serving.step_index,
            serving: serving.into(),
            neighbor: neighbor.into(),
        }
    }
}
