//! LIMS Session
//!
//! The client-side boundary between a remote LIMS and the lineage code.
//!
//! # Core Operations
//!
//! - **Identity**: every `(kind, id)` resolves to one shared [`Handle`]
//! - **Lazy load**: content is fetched on first access, or on demand with
//!   [`Session::load`] / [`Session::get_batch`]
//! - **Lineage**: parent process, inputs and outputs as typed accessors
//!
//! # Architecture
//!
//! ```text
//! caller → Session → EntityCache (bounded FIFO identity map)
//!              ↓            ↑
//!         LimsService → ArtifactRecord / ProcessRecord → Handle
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lims_session::{Session, SessionConfig};
//!
//! let session = Session::new(service, SessionConfig::new().with_cache_capacity(500));
//! let artifact = session.artifact(&"2-101".parse()?);
//! if let Some(parent) = artifact.parent_process(&session)? {
//!     for input in parent.all_inputs(&session, true)? {
//!         println!("{input}");
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod lineage;
pub mod service;
pub mod session;
pub mod snapshot;

// Re-exports for convenience
pub use cache::{CacheStats, EntityCache, EntityKey, DEFAULT_CACHE_CAPACITY};
pub use config::SessionConfig;
pub use entity::{Artifact, Handle, Process, Record};
pub use error::{ConfigError, SessionError, SessionResult};
pub use lineage::AnalyteSide;
pub use service::LimsService;
pub use session::Session;
pub use snapshot::{LabSnapshot, SnapshotService};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sessions
    pub use crate::entity::{Artifact, Handle, Process};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::service::LimsService;
    pub use crate::session::Session;
    pub use lims_model::{ArtifactRecord, LimsId, OutputType, ProcessRecord};
}
