use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub observer: ObserverConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub events: EventThresholds,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub annealing: AnnealingConfig,
    #[serde(default)]
    pub cost: CostConfig,
    pub constellations: BTreeMap<String, ConstellationTarget>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Defaults to the latest epoch in the catalog.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// Defaults to the longest constellation orbital period.
    #[serde(default, with = "opt_duration")]
    pub duration: Option<Duration>,
    #[serde(default = "default_step", with = "duration_str")]
    pub step: Duration,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            start: None,
            duration: None,
            step: default_step(),
        }
    }
}

fn default_step() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    #[serde(default = "default_tx_power_dbm")]
    pub tx_power_dbm: f64,
    #[serde(default = "default_tx_gain_dbi")]
    pub tx_antenna_gain_dbi: f64,
    #[serde(default = "default_rx_gain_dbi")]
    pub rx_antenna_gain_dbi: f64,
    #[serde(default = "default_elevation_gain_slope")]
    pub elevation_gain_db_per_deg: f64,
    #[serde(default = "default_max_elevation_gain")]
    pub max_elevation_gain_db: f64,
    /// Signal mapped to quality 0.0
    #[serde(default = "default_quality_floor")]
    pub quality_floor_dbm: f64,
    /// Signal mapped to quality 1.0
    #[serde(default = "default_quality_ceiling")]
    pub quality_ceiling_dbm: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            tx_power_dbm: default_tx_power_dbm(),
            tx_antenna_gain_dbi: default_tx_gain_dbi(),
            rx_antenna_gain_dbi: default_rx_gain_dbi(),
            elevation_gain_db_per_deg: default_elevation_gain_slope(),
            max_elevation_gain_db: default_max_elevation_gain(),
            quality_floor_dbm: default_quality_floor(),
            quality_ceiling_dbm: default_quality_ceiling(),
        }
    }
}

fn default_frequency_hz() -> f64 {
    12.0e9
}
fn default_tx_power_dbm() -> f64 {
    28.0
}
fn default_tx_gain_dbi() -> f64 {
    30.0
}
fn default_rx_gain_dbi() -> f64 {
    17.0
}
fn default_elevation_gain_slope() -> f64 {
    0.05
}
fn default_max_elevation_gain() -> f64 {
    4.0
}
fn default_quality_floor() -> f64 {
    -115.0
}
fn default_quality_ceiling() -> f64 {
    -90.0
}

/// Handover trigger thresholds (3GPP A4 / A5 / D2 style).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EventThresholds {
    #[serde(default = "default_hysteresis_db")]
    pub hysteresis_db: f64,
    #[serde(default = "default_neighbor_offset_dbm")]
    pub neighbor_offset_threshold_dbm: f64,
    #[serde(default = "default_serving_bad_dbm")]
    pub serving_bad_threshold_dbm: f64,
    #[serde(default = "default_neighbor_good_dbm")]
    pub neighbor_good_threshold_dbm: f64,
    #[serde(default = "default_serving_far_km")]
    pub serving_far_km: f64,
    #[serde(default = "default_neighbor_near_km")]
    pub neighbor_near_km: f64,
    #[serde(default = "default_distance_hysteresis_km")]
    pub distance_hysteresis_km: f64,
}

impl Default for EventThresholds {
    fn default() -> Self {
        Self {
            hysteresis_db: default_hysteresis_db(),
            neighbor_offset_threshold_dbm: default_neighbor_offset_dbm(),
            serving_bad_threshold_dbm: default_serving_bad_dbm(),
            neighbor_good_threshold_dbm: default_neighbor_good_dbm(),
            serving_far_km: default_serving_far_km(),
            neighbor_near_km: default_neighbor_near_km(),
            distance_hysteresis_km: default_distance_hysteresis_km(),
        }
    }
}

fn default_hysteresis_db() -> f64 {
    3.0
}
fn default_neighbor_offset_dbm() -> f64 {
    -100.0
}
fn default_serving_bad_dbm() -> f64 {
    -105.0
}
fn default_neighbor_good_dbm() -> f64 {
    -100.0
}
fn default_serving_far_km() -> f64 {
    1500.0
}
fn default_neighbor_near_km() -> f64 {
    1200.0
}
fn default_distance_hysteresis_km() -> f64 {
    50.0
}

/// Weights used by the coverage selector when ranking candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_duration_weight")]
    pub duration_weight: f64,
    #[serde(default = "default_elevation_weight")]
    pub elevation_weight: f64,
    #[serde(default = "default_opportunity_weight")]
    pub opportunity_weight: f64,
    /// Shortlist keeps `pool_size * shortlist_factor` candidates.
    #[serde(default = "default_shortlist_factor")]
    pub shortlist_factor: f64,
    /// Weight of orbital angles versus visibility overlap in phase diversity.
    #[serde(default = "default_orbital_phase_weight")]
    pub orbital_phase_weight: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            duration_weight: default_duration_weight(),
            elevation_weight: default_elevation_weight(),
            opportunity_weight: default_opportunity_weight(),
            shortlist_factor: default_shortlist_factor(),
            orbital_phase_weight: default_orbital_phase_weight(),
        }
    }
}

fn default_duration_weight() -> f64 {
    0.5
}
fn default_elevation_weight() -> f64 {
    0.35
}
fn default_opportunity_weight() -> f64 {
    0.15
}
fn default_shortlist_factor() -> f64 {
    4.0
}
fn default_orbital_phase_weight() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealingConfig {
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,
    #[serde(default = "default_cooling_rate")]
    pub cooling_rate: f64,
    #[serde(default = "default_min_temperature")]
    pub min_temperature: f64,
    /// Consecutive accepted steps without a new best before a round stops.
    #[serde(default = "default_stall_limit")]
    pub stall_limit: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default, with = "opt_duration")]
    pub round_timeout: Option<Duration>,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: default_initial_temperature(),
            cooling_rate: default_cooling_rate(),
            min_temperature: default_min_temperature(),
            stall_limit: default_stall_limit(),
            max_iterations: default_max_iterations(),
            rounds: default_rounds(),
            seed: default_seed(),
            round_timeout: None,
        }
    }
}

fn default_initial_temperature() -> f64 {
    500.0
}
fn default_cooling_rate() -> f64 {
    0.995
}
fn default_min_temperature() -> f64 {
    0.05
}
fn default_stall_limit() -> u32 {
    1000
}
fn default_max_iterations() -> u32 {
    20_000
}
fn default_rounds() -> u32 {
    4
}
fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostConfig {
    /// Added per timestep whose visible count is outside the target range.
    #[serde(default = "default_out_of_range_penalty")]
    pub out_of_range_penalty: f64,
    /// Added once per violated pool-size or balance constraint.
    #[serde(default = "default_constraint_penalty")]
    pub constraint_penalty: f64,
    #[serde(default = "default_phase_weight")]
    pub phase_weight: f64,
    #[serde(default = "default_signal_weight")]
    pub signal_weight: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            out_of_range_penalty: default_out_of_range_penalty(),
            constraint_penalty: default_constraint_penalty(),
            phase_weight: default_phase_weight(),
            signal_weight: default_signal_weight(),
        }
    }
}

fn default_out_of_range_penalty() -> f64 {
    100.0
}
fn default_constraint_penalty() -> f64 {
    10_000.0
}
fn default_phase_weight() -> f64 {
    10.0
}
fn default_signal_weight() -> f64 {
    5.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub min: u32,
    pub max: u32,
}

impl VisibleRange {
    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstellationTarget {
    pub min_elevation_deg: f64,
    pub visible_range: VisibleRange,
    pub pool_size: usize,
    /// Weight of visible duration against peak elevation when ranking
    /// this constellation's candidates.
    #[serde(default = "default_coverage_weight")]
    pub coverage_weight: f64,
    /// Fraction of timesteps that must fall inside `visible_range`.
    #[serde(default = "default_min_compliance")]
    pub min_compliance: f64,
    #[serde(default, with = "opt_duration")]
    pub orbital_period: Option<Duration>,
}

fn default_coverage_weight() -> f64 {
    1.0
}
fn default_min_compliance() -> f64 {
    0.9
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects contradictory or missing settings before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let obs = &self.observer;
        if !(-90.0..=90.0).contains(&obs.latitude_deg) {
            return invalid(format!("observer latitude {} out of range", obs.latitude_deg));
        }
        if !(-180.0..=360.0).contains(&obs.longitude_deg) {
            return invalid(format!("observer longitude {} out of range", obs.longitude_deg));
        }
        if self.timeline.step.is_zero() {
            return invalid("timeline step must be positive".into());
        }
        if let Some(duration) = self.timeline.duration {
            if duration < self.timeline.step {
                return invalid("timeline duration shorter than one step".into());
            }
        }
        if self.signal.frequency_hz <= 0.0 {
            return invalid("signal frequency must be positive".into());
        }
        if self.signal.quality_floor_dbm >= self.signal.quality_ceiling_dbm {
            return invalid("signal quality floor must be below its ceiling".into());
        }
        if self.signal.max_elevation_gain_db < 0.0 {
            return invalid("max elevation gain must not be negative".into());
        }
        if self.events.hysteresis_db < 0.0 || self.events.distance_hysteresis_km < 0.0 {
            return invalid("event hysteresis must not be negative".into());
        }
        if self.events.neighbor_near_km <= 0.0 || self.events.serving_far_km <= 0.0 {
            return invalid("distance thresholds must be positive".into());
        }

        let ann = &self.annealing;
        if ann.initial_temperature <= 0.0 {
            return invalid("initial temperature must be positive".into());
        }
        if !(ann.cooling_rate > 0.0 && ann.cooling_rate < 1.0) {
            return invalid(format!("cooling rate {} must be in (0, 1)", ann.cooling_rate));
        }
        if ann.min_temperature <= 0.0 || ann.min_temperature >= ann.initial_temperature {
            return invalid("min temperature must be in (0, initial temperature)".into());
        }
        if ann.rounds == 0 || ann.max_iterations == 0 {
            return invalid("annealing needs at least one round and one iteration".into());
        }

        let cost = &self.cost;
        if cost.phase_weight < 0.0 || cost.signal_weight < 0.0 {
            return invalid("soft cost weights must not be negative".into());
        }
        let hard_min = cost.out_of_range_penalty.min(cost.constraint_penalty);
        if cost.phase_weight + cost.signal_weight >= hard_min {
            return invalid(format!(
                "soft weights ({}) must stay below every hard penalty ({})",
                cost.phase_weight + cost.signal_weight,
                hard_min
            ));
        }

        let sel = &self.selection;
        if sel.duration_weight < 0.0 || sel.elevation_weight < 0.0 || sel.opportunity_weight < 0.0
        {
            return invalid("selection weights must not be negative".into());
        }
        if !(0.0..=1.0).contains(&sel.orbital_phase_weight) {
            return invalid("orbital phase weight must be in [0, 1]".into());
        }
        if sel.shortlist_factor < 1.0 {
            return invalid("shortlist factor must be at least 1".into());
        }

        if self.constellations.is_empty() {
            return invalid("no constellations configured".into());
        }
        for (name, target) in &self.constellations {
            if target.visible_range.min > target.visible_range.max {
                return invalid(format!(
                    "{name}: visible range min {} exceeds max {}",
                    target.visible_range.min, target.visible_range.max
                ));
            }
            if target.pool_size == 0 {
                return invalid(format!("{name}: pool size must be positive"));
            }
            if !(0.0..=1.0).contains(&target.min_compliance) {
                return invalid(format!("{name}: min compliance must be in [0, 1]"));
            }
            if !(-90.0..=90.0).contains(&target.min_elevation_deg) {
                return invalid(format!("{name}: min elevation out of range"));
            }
            if target.coverage_weight < 0.0 {
                return invalid(format!("{name}: coverage weight must not be negative"));
            }
        }
        Ok(())
    }

    pub fn target(&self, constellation: &str) -> Option<&ConstellationTarget> {
        self.constellations.get(constellation)
    }

    /// Length of the sampled window: explicit duration, else the longest
    /// configured orbital period, else 96 minutes.
    pub fn timeline_duration(&self) -> Duration {
        self.timeline.duration.unwrap_or_else(|| {
            self.constellations
                .values()
                .filter_map(|t| t.orbital_period)
                .max()
                .unwrap_or(Duration::from_secs(96 * 60))
        })
    }

    pub fn time_grid(&self, fallback_start: DateTime<Utc>) -> TimeGrid {
        let step_s = self.timeline.step.as_secs_f64();
        let duration_s = self.timeline_duration().as_secs_f64();
        TimeGrid {
            start: self.timeline.start.unwrap_or(fallback_start),
            step_s,
            steps: ((duration_s / step_s).floor() as usize).max(1),
        }
    }
}

/// Fixed sampling grid: `steps` samples at `start + k * step_s`, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeGrid {
    pub start: DateTime<Utc>,
    pub step_s: f64,
    pub steps: usize,
}

impl TimeGrid {
    pub fn time_at(&self, step: usize) -> DateTime<Utc> {
        self.start + ChronoDuration::microseconds((step as f64 * self.step_s * 1e6).round() as i64)
    }

    pub fn offset_s(&self, step: usize) -> f64 {
        step as f64 * self.step_s
    }

    /// Number of leading steps covering `period`, capped at the grid length.
    pub fn steps_within(&self, period: Option<Duration>) -> usize {
        period
            .map(|p| ((p.as_secs_f64() / self.step_s).floor() as usize).clamp(1, self.steps))
            .unwrap_or(self.steps)
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

mod opt_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_str(&humantime::format_duration(*d).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|r| humantime::parse_duration(r.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
