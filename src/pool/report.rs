use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::VisibleRange;
use crate::pool::coordinator::RoundStats;
use crate::pool::cost::CostBreakdown;

/// Published result for one constellation.
#[derive(Debug, Clone, Serialize)]
pub struct ConstellationPool {
    pub constellation: String,
    pub selected_ids: Vec<String>,
    pub pool_size_target: usize,
    pub candidate_count: usize,
    pub shortlist_size: usize,
    pub horizon_steps: usize,
    pub visible_range: VisibleRange,
    pub min_compliance: f64,
    /// Fraction of horizon steps whose visible count is inside the range
    pub compliance_ratio: f64,
    pub phase_diversity: f64,
    /// Circular variance of member rise times over the grid
    pub temporal_spread: f64,
    pub mean_signal_quality: f64,
    pub feasible: bool,
    pub cost: CostBreakdown,
    pub visible_counts: Vec<u32>,
    pub rounds: Vec<RoundStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub constellations: BTreeMap<String, ConstellationPool>,
}

impl PoolReport {
    pub fn new(constellations: BTreeMap<String, ConstellationPool>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            constellations,
        }
    }

    pub fn all_feasible(&self) -> bool {
        self.constellations.values().all(|p| p.feasible)
    }
}
