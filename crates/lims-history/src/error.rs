//! Error types for history reconstruction

use lims_model::RemoteFetchError;
use lims_session::SessionError;
use thiserror::Error;

/// Reconstruction failures
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A reconstructor was built without a session
    #[error("history cannot be computed without a session")]
    MissingHistoryContext,

    /// Load or query failed, or a process on the walk had no I/O map
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl HistoryError {
    /// Whether the remote service was the cause
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Session(SessionError::RemoteFetch(_)))
    }

    /// Whether a process without an I/O map was met
    #[must_use]
    pub fn is_malformed_process(&self) -> bool {
        matches!(self, Self::Session(SessionError::MalformedProcess { .. }))
    }
}

impl From<RemoteFetchError> for HistoryError {
    fn from(err: RemoteFetchError) -> Self {
        Self::Session(err.into())
    }
}

/// Result alias
pub type HistoryResult<T> = Result<T, HistoryError>;
