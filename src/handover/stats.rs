use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::handover::types::{EventKind, HandoverEvent, Priority};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SatelliteEventCounts {
    pub as_serving: usize,
    pub as_neighbor: usize,
}

/// Aggregates consumed by the pool optimizer and the event report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStatistics {
    pub total: usize,
    pub by_kind: BTreeMap<EventKind, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub satellites: BTreeMap<String, SatelliteEventCounts>,
}

impl EventStatistics {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a HandoverEvent>) -> Self {
        let mut stats = Self::default();
        for event in events {
            stats.total += 1;
            *stats.by_kind.entry(event.kind).or_default() += 1;
            *stats.by_priority.entry(event.priority).or_default() += 1;
            stats
                .satellites
                .entry(event.serving_id.clone())
                .or_default()
                .as_serving += 1;
            stats
                .satellites
                .entry(event.neighbor_id.clone())
                .or_default()
                .as_neighbor += 1;
        }
        stats
    }

    /// How often the satellite was offered as a handover target.
    pub fn handover_opportunities(&self, satellite_id: &str) -> usize {
        self.satellites
            .get(satellite_id)
            .map(|c| c.as_neighbor)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub generated_at: DateTime<Utc>,
    pub events: Vec<HandoverEvent>,
    pub statistics: EventStatistics,
    pub constellations: BTreeMap<String, EventStatistics>,
}

impl EventReport {
    pub fn new(by_constellation: BTreeMap<String, Vec<HandoverEvent>>) -> Self {
        let constellations = by_constellation
            .iter()
            .map(|(name, events)| (name.clone(), EventStatistics::from_events(events)))
            .collect();
        let mut events: Vec<_> = by_constellation.into_values().flatten().collect();
        crate::handover::rank_events(&mut events);
        Self {
            generated_at: Utc::now(),
            statistics: EventStatistics::from_events(&events),
            events,
            constellations,
        }
    }
}
