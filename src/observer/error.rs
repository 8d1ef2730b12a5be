use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("degenerate geometry: non-positive range {range_km} km")]
    Degenerate { range_km: f64 },
}
