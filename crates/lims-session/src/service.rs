//! Remote service boundary
//!
//! Everything the session needs from the LIMS: record retrieval by id and
//! two listing queries. Transport, authentication and wire formats live
//! behind implementations of [`LimsService`].

use lims_model::{
    ArtifactQuery, ArtifactRecord, LimsId, ProcessQuery, ProcessRecord, RemoteFetchError,
};

/// Remote LIMS operations consumed by the session
///
/// Calls are blocking. Implementations report transport and status failures
/// as [`RemoteFetchError`]; nothing in this workspace retries them.
#[cfg_attr(test, mockall::automock)]
pub trait LimsService: Send + Sync {
    /// Retrieve one artifact
    ///
    /// # Errors
    /// Returns error on transport failure or non-success status
    fn fetch_artifact(&self, id: &LimsId) -> Result<ArtifactRecord, RemoteFetchError>;

    /// Retrieve one process
    ///
    /// # Errors
    /// Returns error on transport failure or non-success status
    fn fetch_process(&self, id: &LimsId) -> Result<ProcessRecord, RemoteFetchError>;

    /// Retrieve several artifacts in one round trip
    ///
    /// Default implementation issues one call per id.
    ///
    /// # Errors
    /// Returns the first failure encountered
    fn fetch_artifacts(&self, ids: &[LimsId]) -> Result<Vec<ArtifactRecord>, RemoteFetchError> {
        ids.iter().map(|id| self.fetch_artifact(id)).collect()
    }

    /// Retrieve several processes in one round trip
    ///
    /// Default implementation issues one call per id.
    ///
    /// # Errors
    /// Returns the first failure encountered
    fn fetch_processes(&self, ids: &[LimsId]) -> Result<Vec<ProcessRecord>, RemoteFetchError> {
        ids.iter().map(|id| self.fetch_process(id)).collect()
    }

    /// List artifact ids matching a filter
    ///
    /// # Errors
    /// Returns error on transport failure or non-success status
    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<LimsId>, RemoteFetchError>;

    /// List process ids matching a filter
    ///
    /// # Errors
    /// Returns error on transport failure or non-success status
    fn query_processes(&self, query: &ProcessQuery) -> Result<Vec<LimsId>, RemoteFetchError>;
}
