//! Entity handles
//!
//! A [`Handle`] is the in-memory proxy for one remote resource. All handles
//! for the same `(kind, id)` obtained through one session point at the same
//! cell, so loaded content is never split between copies.
//!
//! Content is attached lazily by [`Session::load`](crate::Session::load).

use crate::service::LimsService;
use lims_model::{ArtifactRecord, EntityKind, LimsId, ProcessRecord, RemoteFetchError};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Content type of a cacheable entity
///
/// This trait is **sealed**; the workspace knows exactly two entity kinds.
pub trait Record: Send + Sync + 'static + Debug + private::Sealed {
    /// Entity kind used in cache keys and error messages
    const KIND: EntityKind;

    /// Identifier carried by the record
    fn record_id(&self) -> &LimsId;

    /// Fetch one record
    ///
    /// # Errors
    /// Propagates the service failure
    fn fetch(service: &dyn LimsService, id: &LimsId) -> Result<Self, RemoteFetchError>
    where
        Self: Sized;

    /// Fetch several records in one round trip
    ///
    /// # Errors
    /// Propagates the service failure
    fn fetch_batch(service: &dyn LimsService, ids: &[LimsId]) -> Result<Vec<Self>, RemoteFetchError>
    where
        Self: Sized;
}

#[doc(hidden)]
pub mod private {
    /// Sealed trait marker
    pub trait Sealed {}
}

impl private::Sealed for ArtifactRecord {}
impl private::Sealed for ProcessRecord {}

impl Record for ArtifactRecord {
    const KIND: EntityKind = EntityKind::Artifact;

    fn record_id(&self) -> &LimsId {
        &self.id
    }

    fn fetch(service: &dyn LimsService, id: &LimsId) -> Result<Self, RemoteFetchError> {
        service.fetch_artifact(id)
    }

    fn fetch_batch(service: &dyn LimsService, ids: &[LimsId]) -> Result<Vec<Self>, RemoteFetchError> {
        service.fetch_artifacts(ids)
    }
}

impl Record for ProcessRecord {
    const KIND: EntityKind = EntityKind::Process;

    fn record_id(&self) -> &LimsId {
        &self.id
    }

    fn fetch(service: &dyn LimsService, id: &LimsId) -> Result<Self, RemoteFetchError> {
        service.fetch_process(id)
    }

    fn fetch_batch(service: &dyn LimsService, ids: &[LimsId]) -> Result<Vec<Self>, RemoteFetchError> {
        service.fetch_processes(ids)
    }
}

#[derive(Debug)]
pub(crate) struct EntityCell<R> {
    id: LimsId,
    content: RwLock<Option<Arc<R>>>,
}

/// Shared proxy for one remote entity
///
/// Cheap to clone. Equality and hashing use the identifier; use
/// [`Handle::same_instance`] to check identity of the underlying cell.
pub struct Handle<R: Record> {
    cell: Arc<EntityCell<R>>,
}

/// Handle to an artifact
pub type Artifact = Handle<ArtifactRecord>;

/// Handle to a process
pub type Process = Handle<ProcessRecord>;

impl<R: Record> Handle<R> {
    /// New handle with no content attached
    ///
    /// Handles created here are not registered in any cache; sessions hand
    /// out cached handles through [`Session::entity`](crate::Session::entity).
    #[must_use]
    pub fn detached(id: LimsId) -> Self {
        Self {
            cell: Arc::new(EntityCell {
                id,
                content: RwLock::new(None),
            }),
        }
    }

    /// Handle with content already attached
    #[must_use]
    pub fn with_content(record: R) -> Self {
        let handle = Self::detached(record.record_id().clone());
        handle.attach(record);
        handle
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &LimsId {
        &self.cell.id
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        R::KIND
    }

    /// Whether content has been attached
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.content.read().is_some()
    }

    /// Attached content, without fetching
    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<Arc<R>> {
        self.cell.content.read().clone()
    }

    /// Whether both handles share the same underlying cell
    #[inline]
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn attach(&self, record: R) -> Arc<R> {
        let record = Arc::new(record);
        *self.cell.content.write() = Some(Arc::clone(&record));
        record
    }

    /// Fetch and attach content unless already loaded (or `force`)
    pub(crate) fn load_from(
        &self,
        service: &dyn LimsService,
        force: bool,
    ) -> Result<Arc<R>, RemoteFetchError> {
        if !force {
            if let Some(content) = self.content() {
                return Ok(content);
            }
        }
        tracing::debug!(kind = %R::KIND, id = %self.id(), force, "fetching entity");
        let record = R::fetch(service, self.id())?;
        Ok(self.attach(record))
    }

    pub(crate) fn erased(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.cell) as Arc<dyn Any + Send + Sync>
    }

    pub(crate) fn from_erased(erased: Arc<dyn Any + Send + Sync>) -> Option<Self> {
        erased
            .downcast::<EntityCell<R>>()
            .ok()
            .map(|cell| Self { cell })
    }
}

impl<R: Record> Clone for Handle<R> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<R: Record> PartialEq for Handle<R> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.id == other.cell.id
    }
}

impl<R: Record> Eq for Handle<R> {}

impl<R: Record> Hash for Handle<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cell.id.hash(state);
    }
}

impl<R: Record> Debug for Handle<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(&R::KIND.to_string())
            .field("id", &self.cell.id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<R: Record> Display for Handle<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", R::KIND, self.cell.id)
    }
}
