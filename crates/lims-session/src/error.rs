//! Error types for the session layer
//!
//! Provides error handling for:
//! - Remote fetches (transport/status failures, never retried here)
//! - Malformed process content
//! - Configuration loading

use lims_model::{LimsId, RemoteFetchError};
use std::path::PathBuf;

/// Errors raised while resolving entities through a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Remote service failure
    #[error("remote fetch failed: {0}")]
    RemoteFetch(#[from] RemoteFetchError),

    /// Process has no input/output map at all
    #[error("process {process_id} has no input/output map")]
    MalformedProcess { process_id: LimsId },
}

impl SessionError {
    /// Create malformed process error
    #[inline]
    #[must_use]
    pub fn malformed_process(process_id: &LimsId) -> Self {
        Self::MalformedProcess {
            process_id: process_id.clone(),
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors while loading session configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or shape error
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
