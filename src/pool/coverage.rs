use crate::config::SelectionConfig;
use crate::pool::candidate::PoolCandidate;

/// Ranks candidates by how much visibility they bring on their own.
#[derive(Debug, Clone, Copy)]
pub struct CoverageSelector {
    weights: SelectionConfig,
    coverage_weight: f64,
}

impl CoverageSelector {
    /// `coverage_weight` scales the visible-fraction term of one
    /// constellation against its elevation and opportunity terms.
    pub fn new(weights: SelectionConfig, coverage_weight: f64) -> Self {
        Self {
            weights,
            coverage_weight,
        }
    }

    /// Weighted sum of visible fraction, normalised peak elevation and
    /// normalised handover opportunities.
    pub fn score(&self, candidate: &PoolCandidate<'_>, max_opportunities: usize) -> f64 {
        let w = &self.weights;
        let elevation = (candidate.features.max_elevation_deg / 90.0).clamp(0.0, 1.0);
        let opportunities = if max_opportunities == 0 {
            0.0
        } else {
            candidate.features.handover_opportunities as f64 / max_opportunities as f64
        };
        self.coverage_weight * w.duration_weight * candidate.visible_fraction()
            + w.elevation_weight * elevation
            + w.opportunity_weight * opportunities
    }

    pub fn scores(&self, candidates: &[PoolCandidate<'_>]) -> Vec<f64> {
        let max_opportunities = candidates
            .iter()
            .map(|c| c.features.handover_opportunities)
            .max()
            .unwrap_or(0);
        candidates
            .iter()
            .map(|c| self.score(c, max_opportunities))
            .collect()
    }

    /// Indices of the best `pool_size * shortlist_factor` candidates, best
    /// first. Ties keep catalog order.
    pub fn shortlist(&self, candidates: &[PoolCandidate<'_>], pool_size: usize) -> Vec<usize> {
        let scores = self.scores(candidates);
        let mut ranked: Vec<usize> = (0..candidates.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        let keep = ((pool_size as f64 * self.weights.shortlist_factor).ceil() as usize)
            .max(pool_size)
            .min(candidates.len());
        ranked.truncate(keep);
        ranked
    }
}
