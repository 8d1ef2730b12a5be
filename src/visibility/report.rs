use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::TimeGrid;
use crate::visibility::batch::RejectedSatellite;
use crate::visibility::timeline::VisibilityTimeline;
use crate::visibility::windows::VisibilityWindow;

/// Number of visible satellites at every grid step.
pub fn visible_counts<'a, I>(timelines: I, steps: usize) -> Vec<u32>
where
    I: IntoIterator<Item = &'a VisibilityTimeline>,
{
    let mut counts = vec![0u32; steps];
    for timeline in timelines {
        for sample in timeline.samples.iter().filter(|s| s.visible) {
            if let Some(count) = counts.get_mut(sample.step_index) {
                *count += 1;
            }
        }
    }
    counts
}

/// A stretch of grid steps with nothing visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageGap {
    pub start_step: usize,
    /// Inclusive
    pub end_step: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub max_visible: u32,
    pub min_visible: u32,
    pub avg_visible: f64,
    pub gaps: Vec<CoverageGap>,
}

impl CoverageSummary {
    pub fn from_counts(counts: &[u32], grid: &TimeGrid) -> Self {
        let max_visible = counts.iter().copied().max().unwrap_or(0);
        let min_visible = counts.iter().copied().min().unwrap_or(0);
        let avg_visible = if counts.is_empty() {
            0.0
        } else {
            counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64
        };
        Self {
            max_visible,
            min_visible,
            avg_visible,
            gaps: coverage_gaps(counts, grid),
        }
    }
}

pub fn coverage_gaps(counts: &[u32], grid: &TimeGrid) -> Vec<CoverageGap> {
    let mut gaps = Vec::new();
    let mut open: Option<usize> = None;
    let close = |start: usize, end: usize| CoverageGap {
        start_step: start,
        end_step: end,
        start: grid.time_at(start),
        end: grid.time_at(end + 1),
        duration_s: (end - start + 1) as f64 * grid.step_s,
    };
    for (step, &count) in counts.iter().enumerate() {
        match (count == 0, open) {
            (true, None) => open = Some(step),
            (false, Some(start)) => {
                gaps.push(close(start, step - 1));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        gaps.push(close(start, counts.len() - 1));
    }
    gaps
}

#[derive(Debug, Clone, Serialize)]
pub struct SatelliteVisibility {
    #[serde(flatten)]
    pub timeline: VisibilityTimeline,
    pub windows: Vec<VisibilityWindow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisibilityReport {
    pub generated_at: DateTime<Utc>,
    pub grid: TimeGrid,
    pub satellites: Vec<SatelliteVisibility>,
    pub constellations: BTreeMap<String, CoverageSummary>,
    pub overall: CoverageSummary,
    pub rejected: Vec<RejectedSatellite>,
    pub dropped_samples: usize,
}

impl VisibilityReport {
    pub fn new(
        grid: TimeGrid,
        satellites: Vec<SatelliteVisibility>,
        rejected: Vec<RejectedSatellite>,
    ) -> Self {
        let mut by_constellation: BTreeMap<&str, Vec<&VisibilityTimeline>> = BTreeMap::new();
        for sat in &satellites {
            by_constellation
                .entry(sat.timeline.constellation.as_str())
                .or_default()
                .push(&sat.timeline);
        }
        let constellations = by_constellation
            .into_iter()
            .map(|(name, timelines)| {
                let counts = visible_counts(timelines, grid.steps);
                (name.to_string(), CoverageSummary::from_counts(&counts, &grid))
            })
            .collect();
        let overall_counts = visible_counts(satellites.iter().map(|s| &s.timeline), grid.steps);
        let dropped_samples = satellites.iter().map(|s| s.timeline.dropped_samples).sum();

        Self {
            generated_at: Utc::now(),
            grid,
            overall: CoverageSummary::from_counts(&overall_counts, &grid),
            satellites,
            constellations,
            rejected,
            dropped_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grid(steps: usize) -> TimeGrid {
        TimeGrid {
            start: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
            step_s: 30.0,
            steps,
        }
    }

    #[test]
    fn gaps_cover_zero_runs_including_edges() {
        let g = grid(8);
        let gaps = coverage_gaps(&[0, 0, 2, 1, 0, 3, 0, 0], &g);
        let spans: Vec<_> = gaps.iter().map(|g| (g.start_step, g.end_step)).collect();
        assert_eq!(spans, vec![(0, 1), (4, 4), (6, 7)]);
        assert_eq!(gaps[0].duration_s, 60.0);
        assert_eq!(gaps[2].end, g.time_at(8));
    }

    #[test]
    fn summary_statistics() {
        let summary = CoverageSummary::from_counts(&[2, 4, 3, 3], &grid(4));
        assert_eq!(summary.max_visible, 4);
        assert_eq!(summary.min_visible, 2);
        assert_eq!(summary.avg_visible, 3.0);
        assert!(summary.gaps.is_empty());
    }
}
