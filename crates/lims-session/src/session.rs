//! Explicit session object
//!
//! A [`Session`] couples one [`LimsService`] with one [`EntityCache`]. Every
//! entity lookup and query goes through a session passed in by the caller;
//! there is no process-wide state.

use crate::cache::{CacheStats, EntityCache};
use crate::config::SessionConfig;
use crate::entity::{Artifact, Handle, Process, Record};
use crate::error::SessionResult;
use crate::service::LimsService;
use indexmap::{IndexMap, IndexSet};
use lims_model::{
    ArtifactQuery, ArtifactRecord, ArtifactType, EntityKind, EntityUri, LimsId, ProcessQuery,
    ProcessRecord, RemoteFetchError,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Service handle plus identity cache
///
/// Cache mutation (insert, evict) is serialized by an internal mutex. Remote
/// calls are made without holding it.
pub struct Session {
    config: SessionConfig,
    service: Arc<dyn LimsService>,
    cache: Mutex<EntityCache>,
}

impl Session {
    /// Create session over a service
    #[must_use]
    pub fn new(service: Arc<dyn LimsService>, config: SessionConfig) -> Self {
        let cache = EntityCache::new(config.cache_capacity);
        Self {
            config,
            service,
            cache: Mutex::new(cache),
        }
    }

    /// Create session with default configuration
    #[must_use]
    pub fn with_service(service: Arc<dyn LimsService>) -> Self {
        Self::new(service, SessionConfig::default())
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Underlying service
    #[inline]
    #[must_use]
    pub fn service(&self) -> &dyn LimsService {
        self.service.as_ref()
    }

    /// Locator of `(kind, id)` under the configured base uri
    #[must_use]
    pub fn uri_for(&self, kind: EntityKind, id: &LimsId) -> String {
        EntityUri::new(kind, id.clone()).render(&self.config.base_uri)
    }

    /// Locator of a handle's entity
    #[must_use]
    pub fn uri_of<R: Record>(&self, handle: &Handle<R>) -> String {
        self.uri_for(R::KIND, handle.id())
    }

    /// Cached handle for `id`, created unloaded if absent
    pub fn entity<R: Record>(&self, id: &LimsId) -> Handle<R> {
        self.cache.lock().get_or_create(id)
    }

    /// Artifact handle for `id`
    #[inline]
    pub fn artifact(&self, id: &LimsId) -> Artifact {
        self.entity(id)
    }

    /// Process handle for `id`
    #[inline]
    pub fn process(&self, id: &LimsId) -> Process {
        self.entity(id)
    }

    /// Fetch and attach content unless already loaded
    ///
    /// With `force`, content is fetched again and replaces what was attached.
    ///
    /// # Errors
    /// Returns [`SessionError::RemoteFetch`](crate::SessionError::RemoteFetch)
    /// if the service is unreachable or answers with a failure status
    pub fn load<R: Record>(&self, handle: &Handle<R>, force: bool) -> SessionResult<Arc<R>> {
        Ok(handle.load_from(self.service.as_ref(), force)?)
    }

    /// Artifact handle for `id`, loaded
    ///
    /// # Errors
    /// Returns error if the artifact cannot be fetched
    pub fn load_artifact(&self, id: &LimsId, force: bool) -> SessionResult<Artifact> {
        let handle = self.artifact(id);
        self.load(&handle, force)?;
        Ok(handle)
    }

    /// Process handle for `id`, loaded
    ///
    /// # Errors
    /// Returns error if the process cannot be fetched
    pub fn load_process(&self, id: &LimsId, force: bool) -> SessionResult<Process> {
        let handle = self.process(id);
        self.load(&handle, force)?;
        Ok(handle)
    }

    /// Load several handles with one batch call
    ///
    /// Duplicates (by id) are removed; first-occurrence order is kept. Only
    /// unloaded handles are requested unless `force` is set.
    ///
    /// # Errors
    /// Returns error if the batch call fails or omits a requested id
    pub fn get_batch<R: Record>(
        &self,
        handles: &[Handle<R>],
        force: bool,
    ) -> SessionResult<Vec<Handle<R>>> {
        let mut unique: IndexMap<LimsId, Handle<R>> = IndexMap::new();
        for handle in handles {
            unique
                .entry(handle.id().clone())
                .or_insert_with(|| handle.clone());
        }

        let pending: Vec<LimsId> = unique
            .values()
            .filter(|h| force || !h.is_loaded())
            .map(|h| h.id().clone())
            .collect();

        if !pending.is_empty() {
            tracing::debug!(kind = %R::KIND, count = pending.len(), "batch retrieve");
            let records = R::fetch_batch(self.service.as_ref(), &pending)?;
            let mut attached = IndexSet::new();
            for record in records {
                if let Some(handle) = unique.get(record.record_id()) {
                    attached.insert(handle.id().clone());
                    handle.attach(record);
                }
            }
            if let Some(missing) = pending.iter().find(|id| !attached.contains(*id)) {
                return Err(RemoteFetchError::not_found(R::KIND, missing).into());
            }
        }

        Ok(unique.into_values().collect())
    }

    /// Artifacts matching a query
    ///
    /// With `resolve`, all returned handles are loaded in one batch call.
    ///
    /// # Errors
    /// Returns error if the query or the batch load fails
    pub fn get_artifacts(&self, query: &ArtifactQuery, resolve: bool) -> SessionResult<Vec<Artifact>> {
        let ids = self.service.query_artifacts(query)?;
        let handles: Vec<Artifact> = ids.iter().map(|id| self.artifact(id)).collect();
        if resolve {
            self.get_batch(&handles, false)
        } else {
            Ok(handles)
        }
    }

    /// Analyte artifacts of a sample
    ///
    /// # Errors
    /// Returns error if the query fails
    pub fn sample_analytes(&self, sample_name: &str, resolve: bool) -> SessionResult<Vec<Artifact>> {
        let query = ArtifactQuery::for_sample(sample_name).with_type(ArtifactType::Analyte);
        self.get_artifacts(&query, resolve)
    }

    /// Processes that consumed `input_id`
    ///
    /// # Errors
    /// Returns error if the query fails
    pub fn get_processes(&self, input_id: &LimsId) -> SessionResult<Vec<Process>> {
        self.get_processes_for_inputs(std::slice::from_ref(input_id))
    }

    /// Processes that consumed any of `input_ids`
    ///
    /// # Errors
    /// Returns error if the query fails
    pub fn get_processes_for_inputs(&self, input_ids: &[LimsId]) -> SessionResult<Vec<Process>> {
        let query = ProcessQuery::consuming(input_ids.iter().cloned());
        let ids = self.service.query_processes(&query)?;
        Ok(ids.iter().map(|id| self.process(id)).collect())
    }

    /// Drop the cached entry for `id`
    ///
    /// Handles already held keep working; the next lookup creates a new one.
    pub fn forget<R: Record>(&self, id: &LimsId) -> bool {
        self.cache.lock().remove(R::KIND, id)
    }

    /// Whether `(R::KIND, id)` is currently cached
    #[must_use]
    pub fn is_cached<R: Record>(&self, id: &LimsId) -> bool {
        self.cache.lock().contains(R::KIND, id)
    }

    /// Get cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Attach a record fetched out of band, registering its handle
    ///
    /// Used when content arrives through another channel (snapshots, bulk
    /// exports) and should not be fetched again.
    pub fn prime_artifact(&self, record: ArtifactRecord) -> Artifact {
        let handle = self.artifact(&record.id);
        handle.attach(record);
        handle
    }

    /// Process counterpart of [`Session::prime_artifact`]
    pub fn prime_process(&self, record: ProcessRecord) -> Process {
        let handle = self.process(&record.id);
        handle.attach(record);
        handle
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("cache", &self.cache_stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::service::MockLimsService;
    use lims_model::{EntityKind, ProcessTypeRef};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> LimsId {
        LimsId::new(s).unwrap()
    }

    fn session(mock: MockLimsService) -> Session {
        Session::with_service(Arc::new(mock))
    }

    #[test]
    fn load_fetches_once() {
        let mut mock = MockLimsService::new();
        mock.expect_fetch_artifact()
            .with(eq(id("2-1")))
            .times(1)
            .returning(|id| Ok(ArtifactRecord::analyte(id.clone())));
        let session = session(mock);

        let handle = session.artifact(&id("2-1"));
        session.load(&handle, false).unwrap();
        session.load(&session.artifact(&id("2-1")), false).unwrap();

        assert!(handle.is_loaded());
    }

    #[test]
    fn forced_load_fetches_again() {
        let mut mock = MockLimsService::new();
        mock.expect_fetch_artifact()
            .times(2)
            .returning(|id| Ok(ArtifactRecord::analyte(id.clone())));
        let session = session(mock);

        let handle = session.artifact(&id("2-1"));
        session.load(&handle, false).unwrap();
        session.load(&handle, true).unwrap();
    }

    #[test]
    fn uris_render_under_configured_base() {
        let config = SessionConfig::new().with_base_uri("https://lims.example.org/api/v2/");
        let session = Session::new(Arc::new(MockLimsService::new()), config);

        assert_eq!(
            session.uri_for(EntityKind::Process, &id("24-1")),
            "https://lims.example.org/api/v2/processes/24-1"
        );
        let artifact = session.artifact(&id("2-1"));
        assert_eq!(
            session.uri_of(&artifact),
            "https://lims.example.org/api/v2/artifacts/2-1"
        );
        let parsed = EntityUri::parse(&session.uri_of(&artifact)).unwrap();
        assert_eq!(parsed.id(), artifact.id());
    }

    #[test]
    fn load_by_id_returns_cached_handle() {
        let mut mock = MockLimsService::new();
        mock.expect_fetch_process()
            .times(1)
            .returning(|id| {
                Ok(ProcessRecord::new(
                    id.clone(),
                    ProcessTypeRef {
                        id: LimsId::new("7").unwrap(),
                        name: "Prep".into(),
                    },
                ))
            });
        let session = session(mock);

        let loaded = session.load_process(&id("24-1"), false).unwrap();
        let again = session.load_process(&id("24-1"), false).unwrap();
        assert!(loaded.is_loaded());
        assert!(loaded.same_instance(&again));
    }

    #[test]
    fn load_surfaces_remote_failure_without_retry() {
        let mut mock = MockLimsService::new();
        mock.expect_fetch_process()
            .times(1)
            .returning(|_| Err(RemoteFetchError::Unreachable("connection refused".into())));
        let session = session(mock);

        let handle = session.process(&id("24-1"));
        let err = session.load(&handle, false).unwrap_err();

        assert!(matches!(err, SessionError::RemoteFetch(RemoteFetchError::Unreachable(_))));
        assert!(!handle.is_loaded());
    }

    #[test]
    fn lookups_share_instances() {
        let session = session(MockLimsService::new());
        let a = session.artifact(&id("2-1"));
        let b = session.artifact(&id("2-1"));
        assert!(a.same_instance(&b));
    }

    #[test]
    fn get_artifacts_with_resolve_uses_batch() {
        let mut mock = MockLimsService::new();
        mock.expect_query_artifacts()
            .times(1)
            .returning(|_| Ok(vec![LimsId::new("2-1").unwrap(), LimsId::new("2-2").unwrap()]));
        mock.expect_fetch_artifacts()
            .times(1)
            .returning(|ids| Ok(ids.iter().cloned().map(ArtifactRecord::analyte).collect()));
        let session = session(mock);

        let artifacts = session.sample_analytes("S1", true).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert!(artifacts.iter().all(Handle::is_loaded));
    }

    #[test]
    fn get_batch_skips_loaded_and_dedupes() {
        let mut mock = MockLimsService::new();
        mock.expect_fetch_artifacts()
            .withf(|ids| ids.len() == 1 && ids[0].as_str() == "2-2")
            .times(1)
            .returning(|ids| Ok(ids.iter().cloned().map(ArtifactRecord::analyte).collect()));
        let session = session(mock);

        let loaded = session.prime_artifact(ArtifactRecord::analyte(id("2-1")));
        let pending = session.artifact(&id("2-2"));
        let out = session
            .get_batch(&[loaded.clone(), pending.clone(), loaded], false)
            .unwrap();

        let ids: Vec<&str> = out.iter().map(|h| h.id().as_str()).collect();
        assert_eq!(ids, vec!["2-1", "2-2"]);
        assert!(pending.is_loaded());
    }

    #[test]
    fn get_batch_reports_missing_ids() {
        let mut mock = MockLimsService::new();
        mock.expect_fetch_processes().returning(|_| Ok(Vec::new()));
        let session = session(mock);

        let err = session
            .get_batch(&[session.process(&id("24-1"))], false)
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::RemoteFetch(RemoteFetchError::NotFound { kind: EntityKind::Process, .. })
        ));
    }

    #[test]
    fn get_processes_queries_by_input() {
        let mut mock = MockLimsService::new();
        mock.expect_query_processes()
            .withf(|q| q.input_artifact_ids.len() == 1 && q.input_artifact_ids[0].as_str() == "2-1")
            .times(1)
            .returning(|_| Ok(vec![LimsId::new("24-1").unwrap()]));
        let session = session(mock);

        let processes = session.get_processes(&id("2-1")).unwrap();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].id().as_str(), "24-1");
    }

    #[test]
    fn forget_orphans_existing_handle() {
        let session = session(MockLimsService::new());
        let record = ProcessRecord::new(
            id("24-1"),
            ProcessTypeRef {
                id: id("1"),
                name: "Prep".into(),
            },
        );
        let held = session.prime_process(record);

        assert!(session.forget::<ProcessRecord>(&id("24-1")));
        assert!(!session.is_cached::<ProcessRecord>(&id("24-1")));
        assert!(held.is_loaded());
        assert!(!session.process(&id("24-1")).same_instance(&held));
    }

    #[test]
    fn capacity_comes_from_config() {
        let session = Session::new(
            Arc::new(MockLimsService::new()),
            SessionConfig::new().with_cache_capacity(2),
        );
        for n in 0..5 {
            let _ = session.artifact(&LimsId::new(format!("2-{n}")).unwrap());
        }
        let stats = session.cache_stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.evictions, 3);
    }
}
