mod constellation;
mod detector;
mod stats;
mod types;

pub use detector::{
    most_urgent, paired_samples, rank_events, Conditions, HandoverEventDetector, PairState,
};
pub use stats::{EventReport, EventStatistics, SatelliteEventCounts};
pub use types::{EventKind, HandoverEvent, Measurement, Priority};
