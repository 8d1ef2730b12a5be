use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::abort::AbortFlag;
use crate::catalog::{CatalogBatch, CatalogError, RejectedRecord};
use crate::config::{Config, ConfigError, TimeGrid};
use crate::handover::{EventReport, EventStatistics, HandoverEvent, HandoverEventDetector};
use crate::observer::{GroundObserver, SignalModel};
use crate::orbit::OrbitalElementSet;
use crate::pool::{PoolCandidate, PoolOptimizer, PoolReport};
use crate::visibility::{
    build_timelines, refined_windows, SatelliteVisibility, TimelineBatch, TimelineBuilder,
    VisibilityReport,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("catalog holds no usable element sets")]
    EmptyCatalog,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub visibility: VisibilityReport,
    pub events: EventReport,
    pub pools: PoolReport,
    pub rejected_records: Vec<RejectedRecord>,
}

pub struct Pipeline {
    config: Config,
    observer: GroundObserver,
    abort: AbortFlag,
}

impl Pipeline {
    /// Fails before any computation if the configuration is contradictory.
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            observer: GroundObserver::from(config.observer),
            config,
            abort: AbortFlag::new(),
        })
    }

    pub fn with_observer(mut self, observer: GroundObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = abort;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Grid starting at the configured start, else at the latest epoch.
    pub fn time_grid(&self, catalog: &CatalogBatch) -> Result<TimeGrid, PipelineError> {
        let fallback = self
            .config
            .timeline
            .start
            .or_else(|| catalog.latest_epoch())
            .ok_or(PipelineError::EmptyCatalog)?;
        Ok(self.config.time_grid(fallback))
    }

    pub fn timeline_builder(&self, grid: TimeGrid) -> TimelineBuilder {
        TimelineBuilder::new(grid, self.observer, SignalModel::from(&self.config.signal))
    }

    pub fn elevation_thresholds(&self) -> BTreeMap<String, f64> {
        self.config
            .constellations
            .iter()
            .map(|(name, target)| (name.clone(), target.min_elevation_deg))
            .collect()
    }

    fn timelines(
        &self,
        catalog: &CatalogBatch,
    ) -> Result<(TimelineBuilder, TimelineBatch), PipelineError> {
        if catalog.sets.is_empty() {
            return Err(PipelineError::EmptyCatalog);
        }
        let grid = self.time_grid(catalog)?;
        log::info!(
            "Sampling {} satellites over {} steps of {}s from {}",
            catalog.sets.len(),
            grid.steps,
            grid.step_s,
            grid.start
        );
        let builder = self.timeline_builder(grid);
        let batch = build_timelines(&builder, &catalog.sets, &self.elevation_thresholds());
        Ok((builder, batch))
    }

    pub fn visibility(&self, catalog: &CatalogBatch) -> Result<VisibilityReport, PipelineError> {
        let (builder, batch) = self.timelines(catalog)?;
        Ok(visibility_report(&builder, catalog, batch))
    }

    pub fn events(&self, catalog: &CatalogBatch) -> Result<EventReport, PipelineError> {
        let (_, batch) = self.timelines(catalog)?;
        Ok(EventReport::new(self.detect(&batch)))
    }

    pub fn optimize(&self, catalog: &CatalogBatch) -> Result<PoolReport, PipelineError> {
        let (builder, batch) = self.timelines(catalog)?;
        let events = self.detect(&batch);
        Ok(self.pools(&builder, catalog, &batch, &events))
    }

    pub fn run(&self, catalog: &CatalogBatch) -> Result<RunReport, PipelineError> {
        let (builder, batch) = self.timelines(catalog)?;
        let events = self.detect(&batch);
        let pools = self.pools(&builder, catalog, &batch, &events);
        Ok(RunReport {
            events: EventReport::new(events),
            pools,
            visibility: visibility_report(&builder, catalog, batch),
            rejected_records: catalog.rejected.clone(),
        })
    }

    fn detect(&self, batch: &TimelineBatch) -> BTreeMap<String, Vec<HandoverEvent>> {
        HandoverEventDetector::new(self.config.events).detect_all(&batch.timelines)
    }

    fn pools(
        &self,
        builder: &TimelineBuilder,
        catalog: &CatalogBatch,
        batch: &TimelineBatch,
        events: &BTreeMap<String, Vec<HandoverEvent>>,
    ) -> PoolReport {
        let grid = builder.grid();
        let sets = sets_by_id(catalog);
        let stats: HashMap<&str, EventStatistics> = events
            .iter()
            .map(|(name, events)| (name.as_str(), EventStatistics::from_events(events)))
            .collect();

        let candidates: Vec<PoolCandidate<'_>> = batch
            .timelines
            .iter()
            .map(|timeline| {
                let phase = sets
                    .get(timeline.satellite_id.as_str())
                    .map(|set| set.phase_at(set.offset_at(grid.start)));
                let opportunities = stats
                    .get(timeline.constellation.as_str())
                    .map(|s| s.handover_opportunities(&timeline.satellite_id))
                    .unwrap_or(0);
                PoolCandidate::new(timeline, phase, builder.signal(), opportunities)
            })
            .collect();

        let report =
            PoolOptimizer::new(&self.config, self.abort.clone()).optimize(&candidates, grid);
        if !report.all_feasible() {
            log::warn!("Run {}: at least one pool misses its visibility target", report.run_id);
        }
        report
    }
}

fn sets_by_id(catalog: &CatalogBatch) -> HashMap<&str, &OrbitalElementSet> {
    catalog.sets.iter().map(|s| (s.id.as_str(), s)).collect()
}

fn visibility_report(
    builder: &TimelineBuilder,
    catalog: &CatalogBatch,
    batch: TimelineBatch,
) -> VisibilityReport {
    let sets = sets_by_id(catalog);
    let windows: Vec<_> = batch
        .timelines
        .par_iter()
        .map(|timeline| match sets.get(timeline.satellite_id.as_str()) {
            Some(set) => refined_windows(builder, set, timeline),
            None => timeline.windows(),
        })
        .collect();
    let satellites = batch
        .timelines
        .into_iter()
        .zip(windows)
        .map(|(timeline, windows)| SatelliteVisibility { timeline, windows })
        .collect();
    VisibilityReport::new(*builder.grid(), satellites, batch.rejected)
}
