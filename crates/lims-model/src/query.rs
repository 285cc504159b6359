//! Query filters understood by the remote service

use crate::id::LimsId;
use crate::record::ArtifactType;
use serde::{Deserialize, Serialize};

/// Artifact listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactQuery {
    /// Related to the given sample name
    pub sample_name: Option<String>,
    /// Artifact type tag
    pub artifact_type: Option<ArtifactType>,
    /// Artifact name
    pub name: Option<String>,
}

impl ArtifactQuery {
    /// All artifacts of a sample
    #[must_use]
    pub fn for_sample(sample_name: impl Into<String>) -> Self {
        Self {
            sample_name: Some(sample_name.into()),
            ..Self::default()
        }
    }

    /// Restrict to a type tag
    #[inline]
    #[must_use]
    pub fn with_type(mut self, artifact_type: ArtifactType) -> Self {
        self.artifact_type = Some(artifact_type);
        self
    }
}

/// Process listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessQuery {
    /// Processes consuming any of these artifacts
    pub input_artifact_ids: Vec<LimsId>,
    /// Process type name
    pub process_type: Option<String>,
}

impl ProcessQuery {
    /// Processes that consumed any of the given artifacts
    #[must_use]
    pub fn consuming(ids: impl IntoIterator<Item = LimsId>) -> Self {
        Self {
            input_artifact_ids: ids.into_iter().collect(),
            process_type: None,
        }
    }
}
