//! LIMS Model
//!
//! Identifiers and entity records for the laboratory lineage graph.
//!
//! # Core Concepts
//!
//! - [`LimsId`]: Identifier value type, the identity key of every entity
//! - [`EntityUri`]: Resource locator parsing with `state` suffix handling
//! - [`ArtifactRecord`] / [`ProcessRecord`]: Entity content snapshots
//! - [`RemoteFetchError`]: Failures reported by the remote service
//!
//! # Example
//!
//! ```rust
//! use lims_model::{EntityKind, EntityUri};
//!
//! let uri = EntityUri::parse("https://lims/api/v2/artifacts/2-101?state=7").unwrap();
//! assert_eq!(uri.kind(), EntityKind::Artifact);
//! assert_eq!(uri.id().as_str(), "2-101");
//! assert_eq!(uri.state(), Some("7"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod error;
mod id;
mod query;
mod record;

// Re-exports
pub use error::RemoteFetchError;
pub use id::{EntityKind, EntityUri, IdError, LimsId};
pub use query::{ArtifactQuery, ProcessQuery};
pub use record::{
    ArtifactRecord, ArtifactType, IoDescriptor, IoMapEntry, OutputType, ProcessRecord,
    ProcessTypeRef, SampleRef,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
