use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::orbit::OrbitalElementSet;
use crate::visibility::timeline::{TimelineBuilder, VisibilityTimeline};
use crate::visibility::windows::{find_windows, refine_window, VisibilityWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedSatellite {
    pub id: String,
    pub constellation: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct TimelineBatch {
    pub timelines: Vec<VisibilityTimeline>,
    pub rejected: Vec<RejectedSatellite>,
}

impl TimelineBatch {
    pub fn dropped_samples(&self) -> usize {
        self.timelines.iter().map(|t| t.dropped_samples).sum()
    }

    /// Timelines of one constellation, in catalog order.
    pub fn constellation<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a VisibilityTimeline> + 'a {
        self.timelines.iter().filter(move |t| t.constellation == name)
    }
}

/// Builds one timeline per element set. `thresholds` maps constellation
/// name to its elevation mask; sets of unknown constellations are rejected.
pub fn build_timelines(
    builder: &TimelineBuilder,
    sets: &[OrbitalElementSet],
    thresholds: &BTreeMap<String, f64>,
) -> TimelineBatch {
    let results: Vec<Result<VisibilityTimeline, RejectedSatellite>> = sets
        .par_iter()
        .map(|set| {
            let reject = |reason: String| RejectedSatellite {
                id: set.id.clone(),
                constellation: set.constellation.clone(),
                reason,
            };
            let threshold = thresholds
                .get(&set.constellation)
                .copied()
                .ok_or_else(|| reject(format!("unknown constellation '{}'", set.constellation)))?;
            let timeline = builder
                .build(set, threshold)
                .map_err(|e| reject(e.to_string()))?;
            if timeline.is_empty() {
                return Err(reject("no sample could be computed".into()));
            }
            Ok(timeline)
        })
        .collect();

    let mut batch = TimelineBatch::default();
    for result in results {
        match result {
            Ok(timeline) => batch.timelines.push(timeline),
            Err(rejected) => {
                log::warn!("Skipping satellite {}: {}", rejected.id, rejected.reason);
                batch.rejected.push(rejected);
            }
        }
    }
    log::info!(
        "Built {} timelines ({} rejected, {} samples dropped)",
        batch.timelines.len(),
        batch.rejected.len(),
        batch.dropped_samples()
    );
    batch
}

/// Grid windows of a timeline with AOS/LOS refined against the propagator.
pub fn refined_windows(
    builder: &TimelineBuilder,
    set: &OrbitalElementSet,
    timeline: &VisibilityTimeline,
) -> Vec<VisibilityWindow> {
    let mut windows = find_windows(timeline);
    let Ok(samples) = builder.samples(set, timeline.threshold_deg) else {
        return windows;
    };
    for window in &mut windows {
        refine_window(window, timeline, timeline.threshold_deg, |s| {
            samples.elevation_at(s)
        });
    }
    windows
}
