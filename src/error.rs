//! Error types for the OFTRL cache engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the cache engine
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// Invalid construction parameters or dimension mismatch (fatal)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Numerical problem contained within a single round (recoverable)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Malformed request rejected at ingestion
    #[error("Validation error: {0}")]
    Validation(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Prometheus registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}

impl Error {
    /// Build a configuration error from anything displayable
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Build a validation error from anything displayable
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Build a computation error from anything displayable
    pub fn computation(msg: impl Into<String>) -> Self {
        Error::Computation(msg.into())
    }

    /// Whether the error aborts the current run
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Whether the error is contained within a round
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Computation(_))
    }
}
