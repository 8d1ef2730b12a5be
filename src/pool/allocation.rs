use serde::Serialize;

use crate::config::VisibleRange;

/// Hard constraints of one constellation pool: member quota and the
/// per-step visible-count window over the evaluation horizon.
#[derive(Debug, Clone, Copy)]
pub struct AllocationManager {
    range: VisibleRange,
    pool_size: usize,
    min_compliance: f64,
    horizon: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintViolations {
    /// More members than the quota
    pub oversized: bool,
    /// Quota not filled
    pub unbalanced: bool,
}

impl ConstraintViolations {
    pub fn count(&self) -> u32 {
        self.oversized as u32 + self.unbalanced as u32
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }
}

impl AllocationManager {
    pub fn new(range: VisibleRange, pool_size: usize, min_compliance: f64, horizon: usize) -> Self {
        Self {
            range,
            pool_size,
            min_compliance,
            horizon,
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn range(&self) -> VisibleRange {
        self.range
    }

    /// Members to select from `available` candidates.
    pub fn target_size(&self, available: usize) -> usize {
        self.pool_size.min(available)
    }

    pub fn visible_counts(&self, masks: &[&[bool]]) -> Vec<u32> {
        let mut counts = vec![0u32; self.horizon];
        for mask in masks {
            for (count, _) in counts.iter_mut().zip(mask.iter()).filter(|(_, v)| **v) {
                *count += 1;
            }
        }
        counts
    }

    pub fn out_of_range_steps(&self, counts: &[u32]) -> usize {
        counts.iter().filter(|&&c| !self.range.contains(c)).count()
    }

    /// Fraction of horizon steps whose count lies inside the target range.
    pub fn compliance(&self, counts: &[u32]) -> f64 {
        if counts.is_empty() {
            return 0.0;
        }
        1.0 - self.out_of_range_steps(counts) as f64 / counts.len() as f64
    }

    pub fn violations(&self, members: usize) -> ConstraintViolations {
        ConstraintViolations {
            oversized: members > self.pool_size,
            unbalanced: members < self.pool_size,
        }
    }

    pub fn is_feasible(&self, counts: &[u32], members: usize) -> bool {
        !self.violations(members).any() && self.compliance(counts) >= self.min_compliance
    }
}
