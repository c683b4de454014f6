use thiserror::Error;

/// Errors surfaced by the cohort client
#[derive(Debug, Error)]
pub enum FhirError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
