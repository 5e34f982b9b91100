//! Error types for the embedded server binding.

use std::time::Duration;
use thiserror::Error;
use veldb_native::NativeError;

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

/// Errors returned to callers of the embedded server binding.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The resolved server configuration failed validation.
    ///
    /// Reported before any start attempt; the engine is never launched
    /// with a configuration that cannot be expressed to it.
    #[error("invalid server configuration: {0}")]
    ConfigInvalid(String),

    /// The resolved server configuration could not be serialized to
    /// the engine's startup document.
    #[error("cannot serialize server configuration: {0}")]
    ConfigSerialization(#[from] serde_json::Error),

    /// The connection target could not be interpreted.
    #[error("invalid connection target: {0}")]
    InvalidTarget(String),

    /// Readiness was not observed within the startup deadline.
    ///
    /// Terminal for the startup sequence. The engine may still finish
    /// starting in the background; this layer has abandoned it.
    #[error("server startup timeout expired after {waited:?}")]
    StartupTimeout {
        /// How long readiness was polled before giving up.
        waited: Duration,
    },

    /// The engine run-loop thread could not be spawned.
    #[error("cannot spawn engine run loop: {0}")]
    RunLoopSpawn(#[from] std::io::Error),

    /// Instance acquisition returned the engine's "no instance" token.
    #[error("engine returned an invalid instance handle")]
    InvalidHandle,

    /// An error crossed the native boundary.
    #[error(transparent)]
    Native(#[from] NativeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reports_waited_duration() {
        let err = BindingError::StartupTimeout {
            waited: Duration::from_secs(2),
        };
        assert!(err.to_string().contains("2s"));
    }

    #[test]
    fn native_errors_pass_through_unmodified() {
        let err = BindingError::from(NativeError::engine("index already exists", 12));
        assert_eq!(err.to_string(), "veldb: index already exists (code 12)");
    }
}
