pub mod constants;
mod elements;
mod error;
pub mod frames;
mod propagator;

pub use elements::{ClassicalElements, OrbitalElementSet, PropagationModel, SecularRates};
pub use error::OrbitError;
pub use frames::{sidereal_angle, to_ground_frame};
pub use propagator::{propagate, OrbitalPropagator, StateVector};
