//! Error types for pagesync

use std::time::Duration;

use thiserror::Error;

use crate::driver::DriverError;

/// Result type alias using pagesync Error
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that cross the synchronization boundary.
///
/// Probe errors and intermediate fallback failures never appear here; they are
/// absorbed by the wait engine and the dispatcher.
#[derive(Error, Debug)]
pub enum Error {
    #[error("wait requires at least one state probe")]
    NoProbes,

    #[error("fallback dispatch requires at least one action attempt")]
    NoAttempts,

    #[error("No state matched within {elapsed:?} ({probes} probe(s) polled)")]
    TimeoutExceeded { elapsed: Duration, probes: usize },

    #[error("All {attempts} attempt(s) failed; last error: {last}")]
    AllAttemptsFailed {
        attempts: usize,
        #[source]
        last: DriverError,
    },

    #[error("Invalid extraction pattern for field '{field}': {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

impl Error {
    /// Whether this error came from an exhausted deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::TimeoutExceeded { .. })
    }
}
