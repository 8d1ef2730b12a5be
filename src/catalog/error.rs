use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog path not found: {0}")]
    NotFound(String),
    #[error("catalog read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog parse error in {file}: {message}")]
    Parse { file: String, message: String },
    #[error("invalid TLE {name}: {message}")]
    InvalidTle { name: String, message: String },
}
