use thiserror::Error;

use crate::observer::GeometryError;
use crate::orbit::OrbitError;

/// Why a single sample could not be produced.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error(transparent)]
    Orbit(#[from] OrbitError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
