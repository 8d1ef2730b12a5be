use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrbitError {
    #[error("invalid orbital elements for {id}: {reason}")]
    InvalidOrbitalElements { id: String, reason: String },
    #[error("propagation failed for {id}: {message}")]
    Propagation { id: String, message: String },
}

impl OrbitError {
    pub fn invalid(id: &str, reason: impl Into<String>) -> Self {
        OrbitError::InvalidOrbitalElements {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn propagation(id: &str, err: impl std::fmt::Display) -> Self {
        OrbitError::Propagation {
            id: id.to_string(),
            message: err.to_string(),
        }
    }
}
