use std::collections::BTreeMap;

use crate::abort::AbortFlag;
use crate::config::{Config, ConstellationTarget, TimeGrid};
use crate::pool::allocation::AllocationManager;
use crate::pool::candidate::PoolCandidate;
use crate::pool::coordinator::OptimizationCoordinator;
use crate::pool::cost::CostModel;
use crate::pool::coverage::CoverageSelector;
use crate::pool::phase::{circular_variance, PhaseOptimizer};
use crate::pool::report::{ConstellationPool, PoolReport};
use crate::pool::solution::SearchSpace;

/// Runs the shortlist, scoring and annealing stages for every configured
/// constellation.
pub struct PoolOptimizer<'cfg> {
    config: &'cfg Config,
    abort: AbortFlag,
}

impl<'cfg> PoolOptimizer<'cfg> {
    pub fn new(config: &'cfg Config, abort: AbortFlag) -> Self {
        Self { config, abort }
    }

    pub fn optimize(&self, candidates: &[PoolCandidate<'_>], grid: &TimeGrid) -> PoolReport {
        let mut pools = BTreeMap::new();
        for (name, target) in &self.config.constellations {
            let members: Vec<PoolCandidate<'_>> = candidates
                .iter()
                .filter(|c| &c.constellation == name)
                .cloned()
                .collect();
            let pool = self.optimize_constellation(name, target, &members, grid);
            pools.insert(name.clone(), pool);
        }
        PoolReport::new(pools)
    }

    pub fn optimize_constellation(
        &self,
        name: &str,
        target: &ConstellationTarget,
        candidates: &[PoolCandidate<'_>],
        grid: &TimeGrid,
    ) -> ConstellationPool {
        let selector = CoverageSelector::new(self.config.selection, target.coverage_weight);
        let shortlist = selector.shortlist(candidates, target.pool_size);
        let scores = selector.scores(candidates);
        let horizon = grid.steps_within(target.orbital_period);

        if candidates.len() < target.pool_size {
            log::warn!(
                "{}: only {} candidates for a pool of {}",
                name,
                candidates.len(),
                target.pool_size
            );
        }

        let space = SearchSpace::new(
            shortlist.iter().map(|&i| &candidates[i]).collect(),
            shortlist.iter().map(|&i| scores[i]).collect(),
            &PhaseOptimizer::new(self.config.selection.orbital_phase_weight),
            AllocationManager::new(
                target.visible_range,
                target.pool_size,
                target.min_compliance,
                horizon,
            ),
            CostModel::new(self.config.cost),
        );
        let outcome =
            OptimizationCoordinator::new(self.config.annealing.clone(), self.abort.clone())
                .optimize(&space);
        let best = &outcome.best;

        let rise_phases: Vec<f64> = best
            .selected
            .iter()
            .filter_map(|&i| space.candidates[i].features.rise_phase_deg)
            .collect();
        let compliance_ratio = space.allocation.compliance(&best.visible_counts);

        if outcome.feasible {
            log::info!(
                "{}: selected {} of {} candidates, compliance {:.3}",
                name,
                best.len(),
                candidates.len(),
                compliance_ratio
            );
        } else {
            log::warn!(
                "{}: no feasible pool found, best compliance {:.3} (cost {:.1})",
                name,
                compliance_ratio,
                best.cost.total
            );
        }

        ConstellationPool {
            constellation: name.to_string(),
            selected_ids: best
                .selected
                .iter()
                .map(|&i| space.candidates[i].id.clone())
                .collect(),
            pool_size_target: target.pool_size,
            candidate_count: candidates.len(),
            shortlist_size: space.len(),
            horizon_steps: horizon,
            visible_range: target.visible_range,
            min_compliance: target.min_compliance,
            compliance_ratio,
            phase_diversity: best.phase_diversity(),
            temporal_spread: circular_variance(&rise_phases),
            mean_signal_quality: best.signal_quality(),
            feasible: outcome.feasible,
            cost: best.cost,
            visible_counts: best.visible_counts.clone(),
            rounds: outcome.rounds,
        }
    }
}
