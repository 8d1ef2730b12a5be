mod batch;
mod error;
mod report;
mod sample;
mod timeline;
mod windows;

pub use batch::{build_timelines, refined_windows, RejectedSatellite, TimelineBatch};
pub use error::SampleError;
pub use report::{
    coverage_gaps, visible_counts, CoverageGap, CoverageSummary, SatelliteVisibility,
    VisibilityReport,
};
pub use sample::VisibilitySample;
pub use timeline::{Samples, TimelineBuilder, VisibilityTimeline};
pub use windows::{find_windows, refine_window, VisibilityWindow};
