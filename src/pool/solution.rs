use serde::Serialize;

use crate::pool::allocation::AllocationManager;
use crate::pool::candidate::PoolCandidate;
use crate::pool::cost::{CostBreakdown, CostModel};
use crate::pool::phase::{pair_count, DiversityMatrix, PhaseOptimizer};

/// Everything a round needs to score a member set. Indices refer to
/// `candidates`.
pub struct SearchSpace<'c, 'a> {
    pub candidates: Vec<&'c PoolCandidate<'a>>,
    pub scores: Vec<f64>,
    pub diversity: DiversityMatrix,
    pub allocation: AllocationManager,
    pub cost_model: CostModel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSolution {
    pub selected: Vec<usize>,
    #[serde(skip)]
    pub unselected: Vec<usize>,
    pub visible_counts: Vec<u32>,
    #[serde(skip)]
    diversity_sum: f64,
    #[serde(skip)]
    signal_sum: f64,
    pub cost: CostBreakdown,
}

impl PoolSolution {
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn phase_diversity(&self) -> f64 {
        match pair_count(self.selected.len()) {
            0 => 1.0,
            pairs => self.diversity_sum / pairs as f64,
        }
    }

    pub fn signal_quality(&self) -> f64 {
        if self.selected.is_empty() {
            0.0
        } else {
            self.signal_sum / self.selected.len() as f64
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }
}

impl<'c, 'a> SearchSpace<'c, 'a> {
    pub fn new(
        candidates: Vec<&'c PoolCandidate<'a>>,
        scores: Vec<f64>,
        phase: &PhaseOptimizer,
        allocation: AllocationManager,
        cost_model: CostModel,
    ) -> Self {
        let diversity = phase.matrix(&candidates);
        Self {
            candidates,
            scores,
            diversity,
            allocation,
            cost_model,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn mask(&self, index: usize) -> &[bool] {
        let visible = &self.candidates[index].visible;
        &visible[..visible.len().min(self.allocation.horizon())]
    }

    fn quality(&self, index: usize) -> f64 {
        self.candidates[index].features.signal_quality
    }

    /// Builds a solution from scratch for the given members.
    pub fn solution(&self, selected: Vec<usize>) -> PoolSolution {
        let masks: Vec<&[bool]> = selected.iter().map(|&i| self.mask(i)).collect();
        let visible_counts = self.allocation.visible_counts(&masks);
        let diversity_sum = PhaseOptimizer::solution_diversity(&self.diversity, &selected)
            * pair_count(selected.len()) as f64;
        let signal_sum = selected.iter().map(|&i| self.quality(i)).sum();
        let unselected = (0..self.len()).filter(|i| !selected.contains(i)).collect();
        let mut solution = PoolSolution {
            selected,
            unselected,
            visible_counts,
            diversity_sum,
            signal_sum,
            cost: CostBreakdown::default(),
        };
        solution.cost = self.cost(&solution);
        solution
    }

    pub fn cost(&self, solution: &PoolSolution) -> CostBreakdown {
        self.cost_model.evaluate(
            self.allocation.out_of_range_steps(&solution.visible_counts),
            self.allocation.violations(solution.len()),
            solution.phase_diversity(),
            solution.signal_quality(),
        )
    }

    /// Replaces `selected[slot]` with `unselected[pick]` and updates the
    /// aggregates and cost incrementally.
    pub fn swap(&self, solution: &mut PoolSolution, slot: usize, pick: usize) {
        let outgoing = solution.selected[slot];
        let incoming = solution.unselected[pick];

        for (count, _) in solution
            .visible_counts
            .iter_mut()
            .zip(self.mask(outgoing))
            .filter(|(_, v)| **v)
        {
            *count -= 1;
        }
        for (count, _) in solution
            .visible_counts
            .iter_mut()
            .zip(self.mask(incoming))
            .filter(|(_, v)| **v)
        {
            *count += 1;
        }

        solution.diversity_sum -= self.diversity.sum_against(outgoing, &solution.selected);
        solution.selected[slot] = incoming;
        solution.diversity_sum += self.diversity.sum_against(incoming, &solution.selected);
        solution.signal_sum += self.quality(incoming) - self.quality(outgoing);
        solution.unselected[pick] = outgoing;
        solution.cost = self.cost(solution);
    }

    pub fn is_feasible(&self, solution: &PoolSolution) -> bool {
        self.allocation
            .is_feasible(&solution.visible_counts, solution.len())
    }
}

/// Private state of one annealing round.
#[derive(Debug, Clone)]
pub struct OptimizationState {
    pub temperature: f64,
    pub iteration: u32,
    pub stall: u32,
    pub accepted: u32,
    pub current: PoolSolution,
    pub best: PoolSolution,
    /// Best cost after every accepted step
    pub best_trace: Vec<f64>,
}

impl OptimizationState {
    pub fn new(initial: PoolSolution, temperature: f64) -> Self {
        Self {
            temperature,
            iteration: 0,
            stall: 0,
            accepted: 0,
            best_trace: vec![initial.cost.total],
            best: initial.clone(),
            current: initial,
        }
    }

    /// Takes an accepted neighbor as current; promotes it to best only on
    /// strict improvement, otherwise the stall counter grows.
    pub fn accept(&mut self, neighbor: PoolSolution) {
        self.accepted += 1;
        if neighbor.cost.total < self.best.cost.total {
            self.best = neighbor.clone();
            self.stall = 0;
        } else {
            self.stall += 1;
        }
        self.current = neighbor;
        self.best_trace.push(self.best.cost.total);
    }
}
