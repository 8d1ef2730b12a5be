use serde::Serialize;

use crate::config::TimeGrid;
use crate::observer::{observe, range_rate, GroundObserver, SignalModel};
use crate::orbit::frames::{sidereal_angle, teme_to_ecef_position, teme_to_ecef_velocity};
use crate::orbit::{OrbitError, OrbitalElementSet, OrbitalPropagator};
use crate::visibility::error::SampleError;
use crate::visibility::sample::VisibilitySample;
use crate::visibility::windows::{find_windows, VisibilityWindow};

#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    grid: TimeGrid,
    observer: GroundObserver,
    signal: SignalModel,
}

impl TimelineBuilder {
    pub fn new(grid: TimeGrid, observer: GroundObserver, signal: SignalModel) -> Self {
        Self {
            grid,
            observer,
            signal,
        }
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn signal(&self) -> &SignalModel {
        &self.signal
    }

    /// Lazy sample sequence for one satellite at the given elevation mask.
    pub fn samples<'a>(
        &'a self,
        set: &'a OrbitalElementSet,
        threshold_deg: f64,
    ) -> Result<Samples<'a>, OrbitError> {
        Ok(Samples {
            builder: self,
            propagator: OrbitalPropagator::new(set)?,
            observer: self.observer.with_min_elevation(threshold_deg),
            grid_offset_s: set.offset_at(self.grid.start),
            next_step: 0,
            dropped: 0,
        })
    }

    pub fn build(
        &self,
        set: &OrbitalElementSet,
        threshold_deg: f64,
    ) -> Result<VisibilityTimeline, OrbitError> {
        let mut samples = self.samples(set, threshold_deg)?;
        let collected: Vec<_> = samples.by_ref().collect();
        Ok(VisibilityTimeline {
            satellite_id: set.id.clone(),
            constellation: set.constellation.clone(),
            threshold_deg,
            grid: self.grid,
            dropped_samples: samples.dropped(),
            samples: collected,
        })
    }

    /// Observe the satellite at an arbitrary offset (seconds after grid start).
    pub fn sample_at(
        &self,
        propagator: &OrbitalPropagator<'_>,
        observer: &GroundObserver,
        grid_offset_s: f64,
        step_index: usize,
        offset_s: f64,
    ) -> Result<VisibilitySample, SampleError> {
        let set = propagator.element_set();
        let since_epoch = grid_offset_s + offset_s;
        let state = propagator.propagate(since_epoch)?;
        let gmst = sidereal_angle(set.epoch, since_epoch);
        let position = teme_to_ecef_position(state.position, gmst);
        let velocity = teme_to_ecef_velocity(state.position, state.velocity, gmst);

        let observation = observe(position, observer)?;
        let rate = range_rate(position, velocity, observer)?;
        let signal = self
            .signal
            .estimate(observation.range_km, observation.elevation_deg)?;
        let timestamp = self.grid.start
            + chrono::Duration::microseconds((offset_s * 1e6).round() as i64);

        Ok(VisibilitySample::new(
            step_index,
            timestamp,
            offset_s,
            observation,
            rate,
            signal,
            observer.min_elevation_deg,
        ))
    }
}

/// Lazy iterator over the grid; see [`TimelineBuilder::samples`].
pub struct Samples<'a> {
    builder: &'a TimelineBuilder,
    propagator: OrbitalPropagator<'a>,
    observer: GroundObserver,
    grid_offset_s: f64,
    next_step: usize,
    dropped: usize,
}

impl Samples<'_> {
    /// Steps skipped so far because they could not be computed.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Elevation at an arbitrary grid offset, for crossing refinement.
    pub fn elevation_at(&self, offset_s: f64) -> Option<f64> {
        self.builder
            .sample_at(
                &self.propagator,
                &self.observer,
                self.grid_offset_s,
                0,
                offset_s,
            )
            .ok()
            .map(|s| s.elevation_deg)
    }
}

impl Iterator for Samples<'_> {
    type Item = VisibilitySample;

    fn next(&mut self) -> Option<Self::Item> {
        let grid = self.builder.grid;
        while self.next_step < grid.steps {
            let step = self.next_step;
            self.next_step += 1;
            match self.builder.sample_at(
                &self.propagator,
                &self.observer,
                self.grid_offset_s,
                step,
                grid.offset_s(step),
            ) {
                Ok(sample) => return Some(sample),
                Err(e) => {
                    log::debug!(
                        "Dropping sample {} of {}: {}",
                        step,
                        self.propagator.element_set().id,
                        e
                    );
                    self.dropped += 1;
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.builder.grid.steps - self.next_step))
    }
}

/// All samples of one satellite in time order. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct VisibilityTimeline {
    pub satellite_id: String,
    pub constellation: String,
    pub threshold_deg: f64,
    #[serde(skip)]
    pub grid: TimeGrid,
    pub samples: Vec<VisibilitySample>,
    pub dropped_samples: usize,
}

impl VisibilityTimeline {
    /// Assembles a timeline from precomputed samples, re-deriving `visible`
    /// from `threshold_deg` and ordering by step.
    pub fn from_samples(
        satellite_id: impl Into<String>,
        constellation: impl Into<String>,
        threshold_deg: f64,
        grid: TimeGrid,
        mut samples: Vec<VisibilitySample>,
    ) -> Self {
        samples.sort_by_key(|s| s.step_index);
        samples.dedup_by_key(|s| s.step_index);
        samples.retain(|s| s.step_index < grid.steps);
        for sample in &mut samples {
            sample.visible = sample.elevation_deg >= threshold_deg;
        }
        let dropped_samples = grid.steps - samples.len();
        Self {
            satellite_id: satellite_id.into(),
            constellation: constellation.into(),
            threshold_deg,
            grid,
            samples,
            dropped_samples,
        }
    }

    pub fn sample_at_step(&self, step: usize) -> Option<&VisibilitySample> {
        self.samples
            .binary_search_by_key(&step, |s| s.step_index)
            .ok()
            .map(|i| &self.samples[i])
    }

    /// One flag per grid step; missing samples count as not visible.
    pub fn visible_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.grid.steps];
        for sample in self.samples.iter().filter(|s| s.visible) {
            mask[sample.step_index] = true;
        }
        mask
    }

    pub fn visible_steps(&self) -> usize {
        self.samples.iter().filter(|s| s.visible).count()
    }

    pub fn max_elevation_deg(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.elevation_deg)
            .max_by(|a, b| a.total_cmp(b))
    }

    pub fn windows(&self) -> Vec<VisibilityWindow> {
        find_windows(self)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
