use crate::pool::candidate::PoolCandidate;

/// Blends separation of orbital angles with disjointness of visibility
/// masks. Both lie in [0, 1], so the blend does too.
#[derive(Debug, Clone, Copy)]
pub struct PhaseOptimizer {
    orbital_weight: f64,
}

/// Symmetric pairwise diversity, stored flat.
#[derive(Debug, Clone)]
pub struct DiversityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl DiversityMatrix {
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[a * self.n + b]
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Sum of diversity between `member` and every index in `others`
    /// except itself.
    pub fn sum_against(&self, member: usize, others: &[usize]) -> f64 {
        others
            .iter()
            .filter(|&&o| o != member)
            .map(|&o| self.get(member, o))
            .sum()
    }
}

impl PhaseOptimizer {
    pub fn new(orbital_weight: f64) -> Self {
        Self {
            orbital_weight: orbital_weight.clamp(0.0, 1.0),
        }
    }

    pub fn pair_diversity(&self, a: &PoolCandidate<'_>, b: &PoolCandidate<'_>) -> f64 {
        let raan = angular_separation(a.features.raan_deg, b.features.raan_deg) / 180.0;
        let anomaly =
            angular_separation(a.features.mean_anomaly_deg, b.features.mean_anomaly_deg) / 180.0;
        let orbital = 0.5 * (raan + anomaly);
        let temporal = 1.0 - overlap(&a.visible, &b.visible);
        self.orbital_weight * orbital + (1.0 - self.orbital_weight) * temporal
    }

    pub fn matrix(&self, candidates: &[&PoolCandidate<'_>]) -> DiversityMatrix {
        let n = candidates.len();
        let mut values = vec![0.0; n * n];
        for a in 0..n {
            for b in (a + 1)..n {
                let d = self.pair_diversity(candidates[a], candidates[b]);
                values[a * n + b] = d;
                values[b * n + a] = d;
            }
        }
        DiversityMatrix { n, values }
    }

    /// Mean pairwise diversity of a member set; 1.0 below two members.
    pub fn solution_diversity(matrix: &DiversityMatrix, members: &[usize]) -> f64 {
        let pairs = pair_count(members.len());
        if pairs == 0 {
            return 1.0;
        }
        let sum: f64 = members
            .iter()
            .enumerate()
            .flat_map(|(i, &a)| members[i + 1..].iter().map(move |&b| (a, b)))
            .map(|(a, b)| matrix.get(a, b))
            .sum();
        sum / pairs as f64
    }
}

pub fn pair_count(members: usize) -> usize {
    members * members.saturating_sub(1) / 2
}

/// Smallest angle between two directions, in [0, 180].
pub fn angular_separation(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Jaccard overlap of two visibility masks; 0 when neither is ever visible.
pub fn overlap(a: &[bool], b: &[bool]) -> f64 {
    let (mut both, mut either) = (0usize, 0usize);
    for (&x, &y) in a.iter().zip(b) {
        both += (x && y) as usize;
        either += (x || y) as usize;
    }
    if either == 0 {
        0.0
    } else {
        both as f64 / either as f64
    }
}

/// Circular variance (1 - mean resultant length) of a set of angles.
/// 0 when all coincide, approaching 1 when evenly spread.
pub fn circular_variance(angles_deg: &[f64]) -> f64 {
    if angles_deg.is_empty() {
        return 0.0;
    }
    let (sin, cos) = angles_deg.iter().fold((0.0, 0.0), |(s, c), a| {
        let (sa, ca) = a.to_radians().sin_cos();
        (s + sa, c + ca)
    });
    let n = angles_deg.len() as f64;
    (1.0 - (sin * sin + cos * cos).sqrt() / n).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::test_support::{candidates, synthetic_timelines};
    use approx::assert_relative_eq;

    #[test]
    fn separated_windows_are_more_diverse_than_overlapping_ones() {
        let timelines =
            synthetic_timelines(&[(0, 10, 40.0), (20, 10, 40.0), (0, 10, 40.0), (0, 10, 40.0)], 40);
        let mut pool = candidates(&timelines);
        for c in &mut pool {
            c.features.raan_deg = 0.0;
            c.features.mean_anomaly_deg = 0.0;
        }
        let phase = PhaseOptimizer::new(0.5);
        let apart = phase.pair_diversity(&pool[0], &pool[1]);
        let together = phase.pair_diversity(&pool[2], &pool[3]);
        assert!(apart > together, "{apart} <= {together}");
        assert_relative_eq!(together, 0.0);
    }

    #[test]
    fn orbital_separation_is_wrapped() {
        assert_eq!(angular_separation(350.0, 10.0), 20.0);
        assert_eq!(angular_separation(0.0, 180.0), 180.0);
        assert_eq!(angular_separation(-90.0, 270.0), 0.0);
    }

    #[test]
    fn matrix_is_symmetric_with_zero_diagonal() {
        let timelines = synthetic_timelines(&[(0, 10, 40.0), (5, 10, 40.0), (25, 10, 40.0)], 40);
        let pool = candidates(&timelines);
        let refs: Vec<_> = pool.iter().collect();
        let m = PhaseOptimizer::new(0.5).matrix(&refs);
        for a in 0..3 {
            assert_eq!(m.get(a, a), 0.0);
            for b in 0..3 {
                assert_eq!(m.get(a, b), m.get(b, a));
            }
        }
        let mean = PhaseOptimizer::solution_diversity(&m, &[0, 1, 2]);
        assert_relative_eq!(mean, (m.get(0, 1) + m.get(0, 2) + m.get(1, 2)) / 3.0);
        assert_eq!(PhaseOptimizer::solution_diversity(&m, &[1]), 1.0);
    }

    #[test]
    fn circular_variance_bounds() {
        assert_relative_eq!(circular_variance(&[30.0, 30.0, 30.0]), 0.0, epsilon = 1e-12);
        assert_relative_eq!(circular_variance(&[0.0, 90.0, 180.0, 270.0]), 1.0, epsilon = 1e-12);
    }
}
