//! Precomputed sample artifact map
//!
//! For each analyte of a sample: the process that produced it and the one
//! same-sample input that process mapped to it. Walking this map needs no
//! remote calls.

use indexmap::IndexMap;
use lims_model::LimsId;
use lims_session::{Process, Session, SessionResult};

/// Producer and same-sample input of one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLink {
    /// Parent process of the artifact
    pub process: Process,
    /// Input of `process` deriving from the same sample
    pub input: LimsId,
}

/// Output artifact id to its [`SampleLink`]
#[derive(Debug, Clone, Default)]
pub struct SampleArtifactMap {
    links: IndexMap<LimsId, SampleLink>,
}

impl SampleArtifactMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map for every analyte of `sample_name`
    ///
    /// Artifacts without a parent process (sample roots) get no entry. When a
    /// parent maps several same-sample inputs to one artifact, the first in
    /// I/O map order is kept.
    ///
    /// # Errors
    /// Returns error if a load fails or a parent process has no I/O map
    pub fn build(session: &Session, sample_name: &str) -> SessionResult<Self> {
        let mut map = Self::new();
        for artifact in session.sample_analytes(sample_name, true)? {
            let Some(parent) = artifact.parent_process(session)? else {
                continue;
            };
            let inputs = session.get_batch(&artifact.input_artifact_list(session)?, false)?;
            let same_sample = inputs.iter().find(|input| {
                input
                    .content()
                    .is_some_and(|record| record.derives_from(sample_name))
            });
            if let Some(input) = same_sample {
                map.insert(artifact.id().clone(), parent, input.id().clone());
            }
        }
        tracing::debug!(sample = sample_name, links = map.len(), "built sample artifact map");
        Ok(map)
    }

    /// Add or replace the link for `output`
    pub fn insert(&mut self, output: LimsId, process: Process, input: LimsId) {
        self.links.insert(output, SampleLink { process, input });
    }

    /// Link for `output`, if mapped
    #[must_use]
    pub fn get(&self, output: &LimsId) -> Option<&SampleLink> {
        self.links.get(output)
    }

    /// Number of mapped artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if map is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Mapped `(output, link)` pairs in build order
    pub fn iter(&self) -> impl Iterator<Item = (&LimsId, &SampleLink)> {
        self.links.iter()
    }
}
