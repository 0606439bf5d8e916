//! Common error types for Gatekeeper components.

use std::path::PathBuf;

use thiserror::Error;

/// Infrastructure and input errors.
///
/// Negative verification results (wrong code, expired, no challenge) are not
/// errors; see [`crate::VerifyOutcome`].
#[derive(Debug, Error)]
pub enum GatekeeperError {
    /// Pepper not loaded yet
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Pepper file could not be read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Code is not representable as ASCII
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session store backend failure
    #[error("Session store error: {0}")]
    Store(String),

    /// Stored record could not be decoded
    #[error("Record codec error: {0}")]
    Codec(String),
}

impl GatekeeperError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the host may retry the call unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::NotInitialized(_))
    }
}
