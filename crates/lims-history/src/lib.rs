//! Sample history reconstruction
//!
//! Rebuilds the processing history of a sample from its lineage graph: the
//! chain of analytes from a target artifact back to the sample root, and at
//! every chain artifact all the processes that consumed it.
//!
//! # Example
//!
//! ```rust,ignore
//! use lims_history::SampleHistory;
//!
//! let history = SampleHistory::builder("S1").session(&session).build()?;
//! let result = history.reconstruct(&"2-303".parse()?, None)?;
//! for artifact in result.chain() {
//!     if let Some(step) = result.on_chain_step(artifact) {
//!         println!("{artifact} -> {} via {}", step.output_artifact_id.as_ref().unwrap(), step.process_type_name);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod artifact_map;
pub mod error;
pub mod history;
pub mod index;
pub mod reconstruct;

pub use artifact_map::{SampleArtifactMap, SampleLink};
pub use error::{HistoryError, HistoryResult};
pub use history::{History, HistoryStep};
pub use index::LocalProcessIndex;
pub use reconstruct::{SampleHistory, SampleHistoryBuilder};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
