use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::handover::detector::{rank_events, HandoverEventDetector, PairState};
use crate::handover::types::HandoverEvent;
use crate::visibility::{VisibilitySample, VisibilityTimeline};

impl HandoverEventDetector {
    /// Events for one constellation; `timelines` must share a grid.
    ///
    /// The serving satellite of a step is the visible one with the highest
    /// elevation. Edge state is kept per (serving, neighbor) pair, so a new
    /// serving satellite starts fresh pairs.
    pub fn detect_constellation(&self, timelines: &[&VisibilityTimeline]) -> Vec<HandoverEvent> {
        let steps = timelines.iter().map(|t| t.grid.steps).max().unwrap_or(0);
        let mut states: HashMap<(usize, usize), PairState> = HashMap::new();
        let mut events = Vec::new();

        for step in 0..steps {
            let present: Vec<(usize, &VisibilitySample)> = timelines
                .iter()
                .enumerate()
                .filter_map(|(idx, t)| t.sample_at_step(step).map(|s| (idx, s)))
                .collect();
            let Some(&(serving_idx, serving)) = present
                .iter()
                .filter(|(_, s)| s.visible)
                .max_by(|a, b| a.1.elevation_deg.total_cmp(&b.1.elevation_deg))
            else {
                continue;
            };

            for &(neighbor_idx, neighbor) in &present {
                if neighbor_idx == serving_idx || !neighbor.visible {
                    continue;
                }
                let state = states.entry((serving_idx, neighbor_idx)).or_default();
                for kind in state.advance(step, self.conditions(serving, neighbor)) {
                    events.push(HandoverEvent::new(
                        kind,
                        &timelines[serving_idx].satellite_id,
                        &timelines[neighbor_idx].satellite_id,
                        serving,
                        neighbor,
                    ));
                }
            }
        }
        rank_events(&mut events);
        events
    }

    /// Runs every constellation in parallel, grouping timelines by tag.
    pub fn detect_all(
        &self,
        timelines: &[VisibilityTimeline],
    ) -> BTreeMap<String, Vec<HandoverEvent>> {
        let mut groups: BTreeMap<&str, Vec<&VisibilityTimeline>> = BTreeMap::new();
        for timeline in timelines {
            groups
                .entry(timeline.constellation.as_str())
                .or_default()
                .push(timeline);
        }
        groups
            .into_par_iter()
            .map(|(name, group)| {
                let events = self.detect_constellation(&group);
                log::debug!("{} handover events for {}", events.len(), name);
                (name.to_string(), events)
            })
            .collect()
    }

    /// Independent pairs evaluated in parallel.
    pub fn detect_pairs(
        &self,
        pairs: &[(&VisibilityTimeline, &VisibilityTimeline)],
    ) -> Vec<HandoverEvent> {
        let mut events: Vec<_> = pairs
            .par_iter()
            .flat_map_iter(|(serving, neighbor)| self.detect(serving, neighbor))
            .collect();
        rank_events(&mut events);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EventThresholds, TimeGrid};
    use crate::handover::EventKind;
    use crate::observer::Observation;
    use chrono::{TimeZone, Utc};

    fn timeline(
        id: &str,
        constellation: &str,
        elevations: &[f64],
        signal: f64,
    ) -> VisibilityTimeline {
        let g = TimeGrid {
            start: Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap(),
            step_s: 30.0,
            steps: elevations.len(),
        };
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
                        azimuth_deg: 0.0,
                        range_km: 900.0,
                    },
                    0.0,
                    signal,
                    10.0,
                )
            })
            .collect();
        VisibilityTimeline::from_samples(id, constellation, 10.0, g, samples)
    }

    #[test]
    fn serving_is_the_highest_visible_satellite() {
        let high = timeline("HIGH", "starlink", &[60.0; 6], -115.0);
        let low = timeline("LOW", "starlink", &[20.0; 6], -95.0);
        let detector = HandoverEventDetector::new(EventThresholds::default());
        let events = detector.detect_constellation(&[&low, &high]);
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.serving_id == "HIGH" && e.neighbor_id == "LOW"));
        // edge triggered: each kind once
        let a5 = events
            .iter()
            .filter(|e| e.kind == EventKind::ServingDegradedNeighborGood)
            .count();
        assert_eq!(a5, 1);
    }

    #[test]
    fn serving_change_opens_a_new_pair() {
        let a = timeline("A", "starlink", &[60.0, 60.0, 20.0, 20.0], -95.0);
        let b = timeline("B", "starlink", &[20.0, 20.0, 60.0, 60.0], -95.0);
        let detector = HandoverEventDetector::new(EventThresholds::default());
        let events = detector.detect_constellation(&[&a, &b]);
        let a4: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::NeighborAboveThreshold)
            .map(|e| (e.serving_id.as_str(), e.step_index))
            .collect();
        assert_eq!(a4, vec![("A", 0), ("B", 2)]);
    }

    #[test]
    fn constellations_are_detected_separately() {
        let timelines = vec![
            timeline("S1", "starlink", &[60.0; 4], -115.0),
            timeline("S2", "starlink", &[30.0; 4], -95.0),
            timeline("O1", "oneweb", &[50.0; 4], -115.0),
        ];
        let detector = HandoverEventDetector::new(EventThresholds::default());
        let all = detector.detect_all(&timelines);
        assert!(!all["starlink"].is_empty());
        // a lone satellite has no neighbors
        assert!(all["oneweb"].is_empty());
    }

    #[test]
    fn pairs_match_sequential_detection() {
        let s = timeline("S", "starlink", &[60.0; 8], -115.0);
        let n1 = timeline("N1", "starlink", &[30.0; 8], -95.0);
        let rising = [-5.0, -5.0, 30.0, 30.0, 30.0, 30.0, 30.0, 30.0];
        let n2 = timeline("N2", "starlink", &rising, -95.0);
        let detector = HandoverEventDetector::new(EventThresholds::default());
        let parallel = detector.detect_pairs(&[(&s, &n1), (&s, &n2)]);
        let mut sequential = detector.detect(&s, &n1);
        sequential.extend(detector.detect(&s, &n2));
        rank_events(&mut sequential);
        assert_eq!(parallel, sequential);
    }
}
