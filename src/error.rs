//! Error types for the tiered cache

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or operating the cache
///
/// Cache operations themselves (`get`, `set`, `clear`, `stats`) are infallible;
/// everything here is raised at construction or wiring time.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected configuration (zero capacity, zero TTL, zero interval)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Duration parse error
    #[error("Failed to parse duration: {0}")]
    DurationParse(String),

    /// Prometheus registration or encoding error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// No async runtime available for background work
    #[error("Runtime error: {0}")]
    Runtime(String),
}
