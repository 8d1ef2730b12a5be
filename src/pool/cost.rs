use serde::Serialize;

use crate::config::CostConfig;
use crate::pool::allocation::ConstraintViolations;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub hard: f64,
    pub soft: f64,
    pub total: f64,
}

/// Hard penalties dominate; soft terms are bounded by their weights, which
/// configuration keeps below every hard penalty.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    weights: CostConfig,
}

impl CostModel {
    pub fn new(weights: CostConfig) -> Self {
        Self { weights }
    }

    pub fn evaluate(
        &self,
        out_of_range_steps: usize,
        violations: ConstraintViolations,
        phase_diversity: f64,
        signal_quality: f64,
    ) -> CostBreakdown {
        let w = &self.weights;
        let hard = w.out_of_range_penalty * out_of_range_steps as f64
            + w.constraint_penalty * violations.count() as f64;
        let soft = w.phase_weight * (1.0 - phase_diversity.clamp(0.0, 1.0))
            + w.signal_weight * (1.0 - signal_quality.clamp(0.0, 1.0));
        CostBreakdown {
            hard,
            soft,
            total: hard + soft,
        }
    }
}
