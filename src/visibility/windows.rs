use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::visibility::timeline::VisibilityTimeline;

/// Crossing refinement stops once the bracket is this narrow (seconds).
const FINE_STEP_SECONDS: f64 = 1.0;

/// A contiguous run of visible samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityWindow {
    pub start_step: usize,
    /// Inclusive
    pub end_step: usize,
    pub aos: DateTime<Utc>,
    pub los: DateTime<Utc>,
    pub peak_elevation_deg: f64,
    pub peak_time: DateTime<Utc>,
    pub duration_s: f64,
    pub rise_azimuth_deg: f64,
    pub set_azimuth_deg: f64,
    pub mean_signal_dbm: f64,
}

impl VisibilityWindow {
    pub fn step_count(&self) -> usize {
        self.end_step - self.start_step + 1
    }

    pub fn contains_step(&self, step: usize) -> bool {
        (self.start_step..=self.end_step).contains(&step)
    }
}

/// Splits a timeline into visibility windows on the sampling grid.
///
/// A window ends at the first non-visible or missing step. Without
/// refinement AOS is the first visible sample and LOS one step after the
/// last, so duration is `steps * step_s`.
pub fn find_windows(timeline: &VisibilityTimeline) -> Vec<VisibilityWindow> {
    let step_s = timeline.grid.step_s;
    let mut windows = Vec::new();
    let mut current: Option<WindowAcc> = None;

    for sample in &timeline.samples {
        let contiguous = current
            .as_ref()
            .is_some_and(|acc| acc.last_step + 1 == sample.step_index);
        if !sample.visible || !contiguous {
            if let Some(acc) = current.take() {
                windows.push(acc.finish(step_s));
            }
        }
        if !sample.visible {
            continue;
        }
        match current.as_mut() {
            Some(acc) => acc.push(sample),
            None => current = Some(WindowAcc::open(sample)),
        }
    }
    if let Some(acc) = current {
        windows.push(acc.finish(step_s));
    }
    windows
}

/// Tightens AOS/LOS of a grid window by bisecting between the bracketing
/// grid steps. `elevation_at` returns the elevation at a grid offset
/// (seconds) or `None` if it cannot be computed, which leaves that edge
/// at its grid value.
pub fn refine_window<F>(
    window: &mut VisibilityWindow,
    timeline: &VisibilityTimeline,
    threshold_deg: f64,
    mut elevation_at: F,
) where
    F: FnMut(f64) -> Option<f64>,
{
    let grid = timeline.grid;
    if window.start_step > 0 {
        let before = grid.offset_s(window.start_step - 1);
        let after = grid.offset_s(window.start_step);
        if let Some(t) = refine_crossing(before, after, true, threshold_deg, &mut elevation_at) {
            window.aos = grid.start + seconds(t);
        }
    }
    if window.end_step + 1 < grid.steps {
        let before = grid.offset_s(window.end_step);
        let after = grid.offset_s(window.end_step + 1);
        if let Some(t) = refine_crossing(before, after, false, threshold_deg, &mut elevation_at) {
            window.los = grid.start + seconds(t);
        }
    }
    window.duration_s = (window.los - window.aos).num_milliseconds() as f64 / 1000.0;
}

/// Bisection on the threshold crossing inside `[low, high]`; returns the
/// first offset known to be on the visible side for a rise, or the first
/// offset below the mask for a set.
fn refine_crossing<F>(
    mut low: f64,
    mut high: f64,
    rising: bool,
    threshold_deg: f64,
    elevation_at: &mut F,
) -> Option<f64>
where
    F: FnMut(f64) -> Option<f64>,
{
    while high - low > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2.0;
        let above = elevation_at(mid)? >= threshold_deg;
        if above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }
    Some(high)
}

fn seconds(s: f64) -> Duration {
    Duration::milliseconds((s * 1000.0).round() as i64)
}

struct WindowAcc {
    start_step: usize,
    last_step: usize,
    aos: DateTime<Utc>,
    last_time: DateTime<Utc>,
    rise_azimuth_deg: f64,
    set_azimuth_deg: f64,
    peak_elevation_deg: f64,
    peak_time: DateTime<Utc>,
    signal_sum: f64,
}

impl WindowAcc {
    fn open(sample: &crate::visibility::VisibilitySample) -> Self {
        Self {
            start_step: sample.step_index,
            last_step: sample.step_index,
            aos: sample.timestamp,
            last_time: sample.timestamp,
            rise_azimuth_deg: sample.azimuth_deg,
            set_azimuth_deg: sample.azimuth_deg,
            peak_elevation_deg: sample.elevation_deg,
            peak_time: sample.timestamp,
            signal_sum: sample.signal_dbm,
        }
    }

    fn push(&mut self, sample: &crate::visibility::VisibilitySample) {
        self.last_step = sample.step_index;
        self.last_time = sample.timestamp;
        self.set_azimuth_deg = sample.azimuth_deg;
        self.signal_sum += sample.signal_dbm;
        if sample.elevation_deg > self.peak_elevation_deg {
            self.peak_elevation_deg = sample.elevation_deg;
            self.peak_time = sample.timestamp;
        }
    }

    fn finish(self, step_s: f64) -> VisibilityWindow {
        let count = self.last_step - self.start_step + 1;
        VisibilityWindow {
            start_step: self.start_step,
            end_step: self.last_step,
            aos: self.aos,
            los: self.last_time + seconds(step_s),
            peak_elevation_deg: self.peak_elevation_deg,
            peak_time: self.peak_time,
            duration_s: count as f64 * step_s,
            rise_azimuth_deg: self.rise_azimuth_deg,
            set_azimuth_deg: self.set_azimuth_deg,
            mean_signal_dbm: self.signal_sum / count as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeGrid;
    use crate::observer::Observation;
    use crate::visibility::VisibilitySample;
    use chrono::TimeZone;

    fn grid(steps: usize) -> TimeGrid {
        TimeGrid {
            start: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
            step_s: 30.0,
            steps,
        }
    }

    fn timeline(elevations: &[f64]) -> VisibilityTimeline {
        let g = grid(elevations.len());
        let samples = elevations
            .iter()
            .enumerate()
            .map(|(k, &el)| {
                VisibilitySample::new(
                    k,
                    g.time_at(k),
                    g.offset_s(k),
                    Observation {
                        elevation_deg: el,
                        azimuth_deg: k as f64 * 10.0,
                        range_km: 1000.0,
                    },
                    0.0,
                    -100.0 + el / 10.0,
                    10.0,
                )
            })
            .collect();
        VisibilityTimeline::from_samples("S", "starlink", 10.0, g, samples)
    }

    #[test]
    fn splits_runs_of_visible_samples() {
        let t = timeline(&[0.0, 12.0, 40.0, 15.0, 5.0, 5.0, 20.0, 30.0]);
        let windows = find_windows(&t);
        assert_eq!(windows.len(), 2);
        assert_eq!((windows[0].start_step, windows[0].end_step), (1, 3));
        assert_eq!(windows[0].peak_elevation_deg, 40.0);
        assert_eq!(windows[0].duration_s, 90.0);
        assert_eq!(windows[0].rise_azimuth_deg, 10.0);
        assert_eq!(windows[0].set_azimuth_deg, 30.0);
        assert_eq!(windows[0].step_count(), 3);
        assert!(windows[0].contains_step(3) && !windows[0].contains_step(4));
        // runs into the end of the grid
        assert_eq!((windows[1].start_step, windows[1].end_step), (6, 7));
    }

    #[test]
    fn missing_step_breaks_a_window() {
        let full = timeline(&[20.0, 20.0, 20.0, 20.0]);
        let mut samples = full.samples.clone();
        samples.remove(2);
        let gapped = VisibilityTimeline::from_samples("S", "starlink", 10.0, full.grid, samples);
        let windows = find_windows(&gapped);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].start_step, 3);
    }

    #[test]
    fn refinement_lands_on_the_linear_crossing() {
        let t = timeline(&[0.0, 20.0, 20.0, 0.0]);
        let mut window = find_windows(&t).remove(0);
        // elevation ramps 0 -> 20 over [0, 30] and 20 -> 0 over [60, 90]
        let profile = |s: f64| {
            Some(if s <= 30.0 {
                s * 20.0 / 30.0
            } else if s <= 60.0 {
                20.0
            } else {
                (90.0 - s) * 20.0 / 30.0
            })
        };
        refine_window(&mut window, &t, 10.0, profile);
        let aos = (window.aos - t.grid.start).num_milliseconds() as f64 / 1000.0;
        let los = (window.los - t.grid.start).num_milliseconds() as f64 / 1000.0;
        assert!((aos - 15.0).abs() <= 1.0, "{aos}");
        assert!((los - 75.0).abs() <= 1.0, "{los}");
        assert!((window.duration_s - 60.0).abs() <= 2.0);
    }
}
