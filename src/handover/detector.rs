use crate::config::EventThresholds;
use crate::handover::types::{EventKind, HandoverEvent};
use crate::visibility::{VisibilitySample, VisibilityTimeline};

#[derive(Debug, Clone, Copy)]
pub struct HandoverEventDetector {
    thresholds: EventThresholds,
}

/// Entry and leave predicates of every kind at one step, indexed like
/// [`EventKind::ALL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conditions {
    pub entering: [bool; 3],
    pub leaving: [bool; 3],
}

/// Condition memory of one (serving, neighbor) pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairState {
    active: [bool; 3],
    last_step: Option<usize>,
}

impl PairState {
    /// Records the conditions at `step` and returns the kinds that just
    /// entered. An active kind stays active until its leave condition holds.
    pub fn advance(&mut self, step: usize, conditions: Conditions) -> Vec<EventKind> {
        let contiguous = self.last_step.is_some_and(|last| last + 1 == step);
        if !contiguous {
            self.active = [false; 3];
        }
        let mut rising = Vec::new();
        for kind in EventKind::ALL {
            let k = kind.index();
            if self.active[k] {
                self.active[k] = !conditions.leaving[k];
            } else if conditions.entering[k] {
                self.active[k] = true;
                rising.push(kind);
            }
        }
        self.last_step = Some(step);
        rising
    }
}

impl HandoverEventDetector {
    pub fn new(thresholds: EventThresholds) -> Self {
        Self { thresholds }
    }

    /// Entry uses `Mn - Hys > Thresh` style tests, leave the mirrored
    /// `Mn + Hys < Thresh`. An invisible satellite leaves every kind it
    /// takes part in.
    pub fn conditions(
        &self,
        serving: &VisibilitySample,
        neighbor: &VisibilitySample,
    ) -> Conditions {
        let t = &self.thresholds;
        if !neighbor.visible {
            return Conditions {
                entering: [false; 3],
                leaving: [true; 3],
            };
        }
        let (ms, mn) = (serving.signal_dbm, neighbor.signal_dbm);
        let (ds, dn) = (serving.range_km, neighbor.range_km);
        let (hys, dist_hys) = (t.hysteresis_db, t.distance_hysteresis_km);

        let a4_enter = mn - hys > t.neighbor_offset_threshold_dbm;
        let a4_leave = mn + hys < t.neighbor_offset_threshold_dbm;

        let a5_enter = serving.visible
            && ms + hys < t.serving_bad_threshold_dbm
            && mn - hys > t.neighbor_good_threshold_dbm;
        let a5_leave = !serving.visible
            || ms - hys > t.serving_bad_threshold_dbm
            || mn + hys < t.neighbor_good_threshold_dbm;

        let d2_enter = serving.visible
            && ds - dist_hys > t.serving_far_km
            && dn + dist_hys < t.neighbor_near_km;
        let d2_leave = !serving.visible
            || ds + dist_hys < t.serving_far_km
            || dn - dist_hys > t.neighbor_near_km;

        Conditions {
            entering: [a4_enter, a5_enter, d2_enter],
            leaving: [a4_leave, a5_leave, d2_leave],
        }
    }

    /// Events for one pair over the steps both timelines cover.
    pub fn detect(
        &self,
        serving: &VisibilityTimeline,
        neighbor: &VisibilityTimeline,
    ) -> Vec<HandoverEvent> {
        let mut state = PairState::default();
        let mut events = Vec::new();
        for (s, n) in paired_samples(&serving.samples, &neighbor.samples) {
            for kind in state.advance(s.step_index, self.conditions(s, n)) {
                events.push(HandoverEvent::new(
                    kind,
                    &serving.satellite_id,
                    &neighbor.satellite_id,
                    s,
                    n,
                ));
            }
        }
        rank_events(&mut events);
        events
    }
}

/// Merge-join of two step-ordered sample slices on `step_index`.
pub fn paired_samples<'a>(
    serving: &'a [VisibilitySample],
    neighbor: &'a [VisibilitySample],
) -> impl Iterator<Item = (&'a VisibilitySample, &'a VisibilitySample)> + 'a {
    let mut i = 0;
    let mut j = 0;
    std::iter::from_fn(move || {
        while i < serving.len() && j < neighbor.len() {
            let (a, b) = (&serving[i], &neighbor[j]);
            match a.step_index.cmp(&b.step_index) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                    return Some((a, b));
                }
            }
        }
        None
    })
}

/// Orders events by time, then priority (high first).
pub fn rank_events(events: &mut [HandoverEvent]) {
    events.sort_by(|a, b| {
        a.step_index
            .cmp(&b.step_index)
            .then(b.priority.cmp(&a.priority))
            .then_with(|| a.serving_id.cmp(&b.serving_id))
            .then_with(|| a.neighbor_id.cmp(&b.neighbor_id))
    });
}

/// Highest-priority event of a batch; earliest wins ties.
pub fn most_urgent(events: &[HandoverEvent]) -> Option<&HandoverEvent> {
    events
        .iter()
        .rev()
        .max_by_key(|e| e.priority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeGrid;
    use crate::handover::Priority;
    use crate::observer::Observation;
    use chrono::{TimeZone, Utc};

    fn grid(steps: usize) -> TimeGrid {
        TimeGrid {
            start: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
            step_s: 30.0,
            steps,
        }
    }

    /// Visible between `from` and `to` (exclusive) at a fixed signal and range.
    fn timeline(
        id: &str,
        steps: usize,
        from: usize,
        to: usize,
        signal: f64,
        range: f64,
    ) -> VisibilityTimeline {
        let g = grid(steps);
        let samples = (0..steps)
            .map(|k| {
                let elevation = if (from..to).contains(&k) { 45.0 } else { -5.0 };
                VisibilitySample::new(
                    k,
                    g.time_at(k),
                    g.offset_s(k),
                    Observation {
                        elevation_deg: elevation,
                        azimuth_deg: 0.0,
                        range_km: range,
                    },
                    0.0,
                    signal,
                    10.0,
                )
            })
            .collect();
        VisibilityTimeline::from_samples(id, "starlink", 10.0, g, samples)
    }

    fn detector() -> HandoverEventDetector {
        HandoverEventDetector::new(EventThresholds::default())
    }

    #[test]
    fn degraded_serving_fires_once_per_interval() {
        let serving = timeline("SERVING", 40, 0, 40, -115.0, 900.0);
        let neighbor = timeline("NEIGHBOR", 40, 10, 30, -95.0, 900.0);
        let events: Vec<_> = detector()
            .detect(&serving, &neighbor)
            .into_iter()
            .filter(|e| e.kind == EventKind::ServingDegradedNeighborGood)
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].step_index, 10);
        assert_eq!(events[0].timestamp, serving.grid.time_at(10));
        assert_eq!(events[0].priority, Priority::High);
        assert_eq!(events[0].serving.signal_dbm, -115.0);
        assert_eq!(events[0].neighbor.signal_dbm, -95.0);
    }

    #[test]
    fn condition_that_clears_can_fire_again() {
        let serving = timeline("S", 30, 0, 30, -115.0, 900.0);
        let mut neighbor = timeline("N", 30, 0, 30, -95.0, 900.0);
        for sample in &mut neighbor.samples[10..15] {
            sample.signal_dbm = -120.0;
        }
        let count = detector()
            .detect(&serving, &neighbor)
            .iter()
            .filter(|e| e.kind == EventKind::ServingDegradedNeighborGood)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn missing_step_resets_the_edge() {
        let serving = timeline("S", 20, 0, 20, -115.0, 900.0);
        let mut neighbor = timeline("N", 20, 0, 20, -95.0, 900.0);
        neighbor.samples.remove(8);
        let steps: Vec<_> = detector()
            .detect(&serving, &neighbor)
            .iter()
            .filter(|e| e.kind == EventKind::ServingDegradedNeighborGood)
            .map(|e| e.step_index)
            .collect();
        assert_eq!(steps, vec![0, 9]);
    }

    #[test]
    fn hysteresis_suppresses_marginal_triggers() {
        // -103 + 3 hysteresis is not below the -105 bad threshold
        let serving = timeline("S", 10, 0, 10, -103.0, 900.0);
        let neighbor = timeline("N", 10, 0, 10, -95.0, 900.0);
        let events = detector().detect(&serving, &neighbor);
        assert!(events.iter().all(|e| e.kind != EventKind::ServingDegradedNeighborGood));
    }

    #[test]
    fn signal_wandering_inside_the_band_fires_once() {
        let serving = timeline("S", 20, 0, 20, -90.0, 900.0);
        let mut neighbor = timeline("N", 20, 0, 20, -96.5, 900.0);
        for sample in neighbor.samples.iter_mut().filter(|s| s.step_index % 2 == 1) {
            sample.signal_dbm = -97.5;
        }
        let steps: Vec<_> = detector()
            .detect(&serving, &neighbor)
            .iter()
            .filter(|e| e.kind == EventKind::NeighborAboveThreshold)
            .map(|e| e.step_index)
            .collect();
        assert_eq!(steps, vec![0]);
    }

    #[test]
    fn kind_leaves_only_past_the_mirrored_threshold() {
        let d = detector();
        let serving = timeline("S", 1, 0, 1, -90.0, 900.0);
        let neighbor = |signal: f64| {
            let mut t = timeline("N", 1, 0, 1, signal, 900.0);
            t.samples.remove(0)
        };
        let a4 = EventKind::NeighborAboveThreshold.index();
        // inside the band: neither entering nor leaving
        let held = d.conditions(&serving.samples[0], &neighbor(-99.0));
        assert!(!held.entering[a4] && !held.leaving[a4]);
        let left = d.conditions(&serving.samples[0], &neighbor(-103.5));
        assert!(left.leaving[a4]);
        let entered = d.conditions(&serving.samples[0], &neighbor(-96.5));
        assert!(entered.entering[a4] && !entered.leaving[a4]);
    }

    #[test]
    fn all_kinds_at_one_step_are_ranked_by_priority() {
        let serving = timeline("S", 10, 0, 10, -115.0, 1700.0);
        let neighbor = timeline("N", 10, 0, 10, -90.0, 800.0);
        let events = detector().detect(&serving, &neighbor);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ServingDegradedNeighborGood,
                EventKind::NeighborAboveThreshold,
                EventKind::DistanceBasedSwitch,
            ]
        );
        assert_eq!(most_urgent(&events).unwrap().kind, EventKind::ServingDegradedNeighborGood);
    }

    #[test]
    fn invisible_neighbor_never_triggers() {
        let serving = timeline("S", 10, 0, 10, -115.0, 1700.0);
        let neighbor = timeline("N", 10, 0, 0, -80.0, 800.0);
        assert!(detector().detect(&serving, &neighbor).is_empty());
    }

    #[test]
    fn merge_join_skips_unmatched_steps() {
        let a = timeline("A", 6, 0, 6, -100.0, 900.0);
        let mut b = timeline("B", 6, 0, 6, -100.0, 900.0);
        b.samples.retain(|s| s.step_index % 2 == 0);
        let steps: Vec<_> = paired_samples(&a.samples, &b.samples)
            .map(|(x, y)| {
                assert_eq!(x.step_index, y.step_index);
                x.step_index
            })
            .collect();
        assert_eq!(steps, vec![0, 2, 4]);
    }
}
