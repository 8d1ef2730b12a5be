use serde::Serialize;

use crate::observer::SignalModel;
use crate::visibility::VisibilityTimeline;

/// Scalar features of a candidate, computed once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateFeatures {
    pub max_elevation_deg: f64,
    pub window_count: usize,
    pub visible_steps: usize,
    pub total_visible_s: f64,
    pub mean_signal_dbm: Option<f64>,
    /// Mean signal mapped onto [0, 1]
    pub signal_quality: f64,
    pub raan_deg: f64,
    pub mean_anomaly_deg: f64,
    /// Grid position of the first observed rise, as an angle over the grid
    pub rise_phase_deg: Option<f64>,
    pub handover_opportunities: usize,
}

#[derive(Debug, Clone)]
pub struct PoolCandidate<'a> {
    pub id: String,
    pub constellation: String,
    pub timeline: &'a VisibilityTimeline,
    /// Visibility per grid step
    pub visible: Vec<bool>,
    pub features: CandidateFeatures,
}

impl<'a> PoolCandidate<'a> {
    /// `phase` is (RAAN, mean anomaly) in degrees at the grid start. Without
    /// it the rise phase stands in for the mean anomaly.
    pub fn new(
        timeline: &'a VisibilityTimeline,
        phase: Option<(f64, f64)>,
        signal: &SignalModel,
        handover_opportunities: usize,
    ) -> Self {
        let windows = timeline.windows();
        let visible = timeline.visible_mask();
        let visible_steps = visible.iter().filter(|v| **v).count();
        let steps = timeline.grid.steps.max(1);

        let visible_signals: Vec<f64> = timeline
            .samples
            .iter()
            .filter(|s| s.visible)
            .map(|s| s.signal_dbm)
            .collect();
        let mean_signal_dbm = (!visible_signals.is_empty())
            .then(|| visible_signals.iter().sum::<f64>() / visible_signals.len() as f64);
        // a window open at step 0 may be a pass already in progress
        let rise_phase_deg = windows
            .iter()
            .find(|w| w.start_step > 0)
            .or(windows.first())
            .map(|w| w.start_step as f64 / steps as f64 * 360.0);
        let (raan_deg, mean_anomaly_deg) =
            phase.unwrap_or((0.0, rise_phase_deg.unwrap_or(0.0)));

        let features = CandidateFeatures {
            max_elevation_deg: timeline
                .samples
                .iter()
                .filter(|s| s.visible)
                .map(|s| s.elevation_deg)
                .fold(f64::NEG_INFINITY, f64::max)
                .max(0.0),
            window_count: windows.len(),
            visible_steps,
            total_visible_s: windows.iter().map(|w| w.duration_s).sum(),
            signal_quality: mean_signal_dbm.map(|s| signal.quality(s)).unwrap_or(0.0),
            mean_signal_dbm,
            raan_deg,
            mean_anomaly_deg,
            rise_phase_deg,
            handover_opportunities,
        };

        Self {
            id: timeline.satellite_id.clone(),
            constellation: timeline.constellation.clone(),
            timeline,
            visible,
            features,
        }
    }

    pub fn visible_fraction(&self) -> f64 {
        self.features.visible_steps as f64 / self.visible.len().max(1) as f64
    }
}
