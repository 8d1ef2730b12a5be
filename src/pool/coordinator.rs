//! Multi-start simulated annealing over one constellation's search space.
//!
//! Rounds are independent: each owns its RNG (seeded from the base seed
//! plus the round index) and its [`OptimizationState`]. They fan out on the
//! rayon pool and are reduced to the lowest-cost best solution.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

use crate::abort::AbortFlag;
use crate::config::AnnealingConfig;
use crate::pool::solution::{OptimizationState, PoolSolution, SearchSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    MinTemperature,
    Stalled,
    MaxIterations,
    Timeout,
    /// Every candidate is already selected, or none is.
    NoMoves,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundStats {
    pub round: u32,
    pub seed: u64,
    pub iterations: u32,
    pub accepted: u32,
    pub initial_cost: f64,
    pub best_cost: f64,
    pub final_temperature: f64,
    pub stop_reason: StopReason,
    pub elapsed_ms: u128,
    pub feasible: bool,
    /// Distinct best costs in the order they were reached.
    pub best_costs: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub best: PoolSolution,
    pub feasible: bool,
    pub rounds: Vec<RoundStats>,
}

pub struct OptimizationCoordinator {
    config: AnnealingConfig,
    abort: AbortFlag,
}

impl OptimizationCoordinator {
    pub fn new(config: AnnealingConfig, abort: AbortFlag) -> Self {
        Self { config, abort }
    }

    pub fn optimize(&self, space: &SearchSpace<'_, '_>) -> OptimizationOutcome {
        let seed = greedy_seed(space);
        let results: Vec<(RoundStats, PoolSolution)> = (0..self.config.rounds)
            .into_par_iter()
            .filter_map(|round| {
                if self.abort.is_raised() {
                    log::info!("Abort raised, skipping round {}", round);
                    return None;
                }
                let (stats, state) = self.run_round(space, &seed, round);
                Some((stats, state.best))
            })
            .collect();

        let mut rounds = Vec::with_capacity(results.len());
        let mut best: Option<PoolSolution> = None;
        for (stats, solution) in results {
            rounds.push(stats);
            if best
                .as_ref()
                .map_or(true, |b| solution.cost.total < b.cost.total)
            {
                best = Some(solution);
            }
        }
        let best = best.unwrap_or_else(|| space.solution(seed));
        let feasible = space.is_feasible(&best);
        OptimizationOutcome {
            best,
            feasible,
            rounds,
        }
    }

    /// One annealing run starting from `seed` (perturbed for rounds > 0).
    pub fn run_round(
        &self,
        space: &SearchSpace<'_, '_>,
        seed: &[usize],
        round: u32,
    ) -> (RoundStats, OptimizationState) {
        let rng_seed = self.config.seed.wrapping_add(round as u64);
        let mut rng = StdRng::seed_from_u64(rng_seed);
        let started = Instant::now();

        let mut initial = space.solution(seed.to_vec());
        if round > 0 {
            perturb(space, &mut initial, &mut rng);
        }
        let initial_cost = initial.cost.total;
        let mut state = OptimizationState::new(initial, self.config.initial_temperature);

        let stop_reason = loop {
            if state.temperature <= self.config.min_temperature {
                break StopReason::MinTemperature;
            }
            if state.iteration >= self.config.max_iterations {
                break StopReason::MaxIterations;
            }
            if state.stall > self.config.stall_limit {
                break StopReason::Stalled;
            }
            if self
                .config
                .round_timeout
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                break StopReason::Timeout;
            }
            if state.current.is_empty() || state.current.unselected.is_empty() {
                break StopReason::NoMoves;
            }

            let slot = rng.gen_range(0..state.current.len());
            let pick = rng.gen_range(0..state.current.unselected.len());
            let mut neighbor = state.current.clone();
            space.swap(&mut neighbor, slot, pick);

            let delta = neighbor.cost.total - state.current.cost.total;
            if delta < 0.0 || rng.gen::<f64>() < (-delta / state.temperature).exp() {
                let previous_best = state.best.cost.total;
                state.accept(neighbor);
                if state.best.cost.total < previous_best {
                    log::debug!(
                        "Round {} iteration {}: new best {:.3}",
                        round,
                        state.iteration,
                        state.best.cost.total
                    );
                }
            }
            state.iteration += 1;
            state.temperature *= self.config.cooling_rate;
        };

        let mut best_costs = state.best_trace.clone();
        best_costs.dedup();
        let stats = RoundStats {
            round,
            seed: rng_seed,
            iterations: state.iteration,
            accepted: state.accepted,
            initial_cost,
            best_cost: state.best.cost.total,
            final_temperature: state.temperature,
            stop_reason,
            elapsed_ms: started.elapsed().as_millis(),
            feasible: space.is_feasible(&state.best),
            best_costs,
        };
        log::debug!(
            "Round {} stopped ({}) after {} iterations: cost {:.2} -> {:.2}",
            round,
            stop_reason,
            stats.iterations,
            initial_cost,
            stats.best_cost
        );
        (stats, state)
    }
}

/// Fills the quota greedily: each pick covers the most under-filled steps
/// and the fewest over-filled ones, ties broken by diversity to the members
/// so far, then by coverage score.
pub fn greedy_seed(space: &SearchSpace<'_, '_>) -> Vec<usize> {
    let target = space.allocation.target_size(space.len());
    let range = space.allocation.range();
    let horizon = space.allocation.horizon();
    let mut counts = vec![0u32; horizon];
    let mut selected: Vec<usize> = Vec::with_capacity(target);

    while selected.len() < target {
        let mut best: Option<(usize, i64, f64)> = None;
        for i in (0..space.len()).filter(|i| !selected.contains(i)) {
            let mask = &space.candidates[i].visible;
            let gain: i64 = counts
                .iter()
                .zip(mask.iter())
                .filter(|(_, v)| **v)
                .map(|(&c, _)| {
                    if c < range.min {
                        1
                    } else if c >= range.max {
                        -1
                    } else {
                        0
                    }
                })
                .sum();
            let diversity = if selected.is_empty() {
                0.0
            } else {
                space.diversity.sum_against(i, &selected) / selected.len() as f64
            };
            let better = match best {
                None => true,
                Some((b, b_gain, b_div)) => {
                    gain > b_gain
                        || (gain == b_gain && diversity > b_div)
                        || (gain == b_gain
                            && diversity == b_div
                            && space.scores[i] > space.scores[b])
                }
            };
            if better {
                best = Some((i, gain, diversity));
            }
        }
        let Some((pick, _, _)) = best else { break };
        for (count, _) in counts
            .iter_mut()
            .zip(space.candidates[pick].visible.iter())
            .filter(|(_, v)| **v)
        {
            *count += 1;
        }
        selected.push(pick);
    }
    selected
}

fn perturb(space: &SearchSpace<'_, '_>, solution: &mut PoolSolution, rng: &mut StdRng) {
    if solution.is_empty() || solution.unselected.is_empty() {
        return;
    }
    for _ in 0..(solution.len() / 4).max(1) {
        let slot = rng.gen_range(0..solution.len());
        let pick = rng.gen_range(0..solution.unselected.len());
        space.swap(solution, slot, pick);
    }
}
