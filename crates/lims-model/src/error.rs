//! Remote service errors

use crate::id::{EntityKind, LimsId};

/// Transport or status failure reported by the remote service
///
/// Never retried inside this workspace; callers decide whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteFetchError {
    /// Service could not be reached
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// Service answered with a non-success status
    #[error("{kind} {id}: service returned status {status}: {message}")]
    Status {
        kind: EntityKind,
        id: LimsId,
        status: u16,
        message: String,
    },

    /// Resource does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: LimsId },

    /// Response could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteFetchError {
    /// Create not-found error
    #[inline]
    #[must_use]
    pub fn not_found(kind: EntityKind, id: &LimsId) -> Self {
        Self::NotFound {
            kind,
            id: id.clone(),
        }
    }

    /// Non-success status code, if any
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}
