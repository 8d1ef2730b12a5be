mod allocation;
mod candidate;
mod coordinator;
mod cost;
mod coverage;
mod optimizer;
mod phase;
mod report;
mod solution;

#[cfg(test)]
pub(crate) mod test_support;

pub use allocation::{AllocationManager, ConstraintViolations};
pub use candidate::{CandidateFeatures, PoolCandidate};
pub use coordinator::{
    greedy_seed, OptimizationCoordinator, OptimizationOutcome, RoundStats, StopReason,
};
pub use cost::{CostBreakdown, CostModel};
pub use coverage::CoverageSelector;
pub use optimizer::PoolOptimizer;
pub use phase::{angular_separation, circular_variance, overlap, DiversityMatrix, PhaseOptimizer};
pub use report::{ConstellationPool, PoolReport};
pub use solution::{OptimizationState, PoolSolution, SearchSpace};
