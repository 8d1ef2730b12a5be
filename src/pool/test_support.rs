use chrono::{TimeZone, Utc};

use crate::config::TimeGrid;
use crate::observer::{Observation, SignalModel};
use crate::pool::PoolCandidate;
use crate::visibility::{VisibilitySample, VisibilityTimeline};

/// `(start_step, length, peak_elevation)` windows wrapping around a grid
/// of `steps` 30-second samples.
pub fn synthetic_timelines(
    specs: &[(usize, usize, f64)],
    steps: usize,
) -> Vec<VisibilityTimeline> {
    let grid = TimeGrid {
        start: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
        step_s: 30.0,
        steps,
    };
    specs
        .iter()
        .enumerate()
        .map(|(idx, &(start, len, peak))| {
            let samples = (0..steps)
                .map(|k| {
                    let inside = (k + steps - start % steps) % steps < len;
                    let elevation = if inside { peak } else { -10.0 };
                    VisibilitySample::new(
                        k,
                        grid.time_at(k),
                        grid.offset_s(k),
                        Observation {
                            elevation_deg: elevation,
                            azimuth_deg: 0.0,
                            range_km: 1000.0,
                        },
                        0.0,
                        -110.0 + elevation / 4.0,
                        10.0,
                    )
                })
                .collect();
            let id = format!("SAT-{idx:02}");
            VisibilityTimeline::from_samples(id, "starlink", 10.0, grid, samples)
        })
        .collect()
}

pub fn candidates(timelines: &[VisibilityTimeline]) -> Vec<PoolCandidate<'_>> {
    timelines
        .iter()
        .map(|t| PoolCandidate::new(t, None, &SignalModel::default(), 0))
        .collect()
}

/// Twenty 20-step windows starting every third step on a 60-step grid.
pub fn staggered_specs() -> Vec<(usize, usize, f64)> {
    (0..20).map(|i| (3 * i, 20, 30.0 + i as f64)).collect()
}
