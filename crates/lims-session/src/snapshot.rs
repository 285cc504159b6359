//! Offline service backed by an exported lab snapshot
//!
//! Answers every [`LimsService`] call from memory. Useful for analysing
//! exports without network access and as the backing store for tests.

use crate::service::LimsService;
use indexmap::IndexMap;
use lims_model::{
    ArtifactQuery, ArtifactRecord, EntityKind, LimsId, ProcessQuery, ProcessRecord,
    RemoteFetchError,
};
use serde::{Deserialize, Serialize};

/// Serializable lab export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabSnapshot {
    /// Every exported artifact
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
    /// Every exported process
    #[serde(default)]
    pub processes: Vec<ProcessRecord>,
}

impl LabSnapshot {
    /// Parse a JSON export
    ///
    /// # Errors
    /// Returns error if the JSON does not describe a snapshot
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

/// In-memory [`LimsService`]
///
/// Listing queries return ids in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SnapshotService {
    artifacts: IndexMap<LimsId, ArtifactRecord>,
    processes: IndexMap<LimsId, ProcessRecord>,
}

impl SnapshotService {
    /// Empty service
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an artifact
    pub fn insert_artifact(&mut self, record: ArtifactRecord) {
        self.artifacts.insert(record.id.clone(), record);
    }

    /// Add or replace a process
    pub fn insert_process(&mut self, record: ProcessRecord) {
        self.processes.insert(record.id.clone(), record);
    }

    /// Number of artifacts and processes held
    #[must_use]
    pub fn len(&self) -> (usize, usize) {
        (self.artifacts.len(), self.processes.len())
    }

    /// Whether the service holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.processes.is_empty()
    }

    /// Export current content
    #[must_use]
    pub fn to_snapshot(&self) -> LabSnapshot {
        LabSnapshot {
            artifacts: self.artifacts.values().cloned().collect(),
            processes: self.processes.values().cloned().collect(),
        }
    }

    fn matches(record: &ArtifactRecord, query: &ArtifactQuery) -> bool {
        query
            .sample_name
            .as_deref()
            .map_or(true, |name| record.derives_from(name))
            && query
                .artifact_type
                .as_ref()
                .map_or(true, |ty| &record.artifact_type == ty)
            && query.name.as_deref().map_or(true, |name| record.name == name)
    }
}

impl From<LabSnapshot> for SnapshotService {
    fn from(snapshot: LabSnapshot) -> Self {
        let mut service = Self::new();
        for record in snapshot.artifacts {
            service.insert_artifact(record);
        }
        for record in snapshot.processes {
            service.insert_process(record);
        }
        service
    }
}

impl LimsService for SnapshotService {
    fn fetch_artifact(&self, id: &LimsId) -> Result<ArtifactRecord, RemoteFetchError> {
        self.artifacts
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteFetchError::not_found(EntityKind::Artifact, id))
    }

    fn fetch_process(&self, id: &LimsId) -> Result<ProcessRecord, RemoteFetchError> {
        self.processes
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteFetchError::not_found(EntityKind::Process, id))
    }

    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<LimsId>, RemoteFetchError> {
        Ok(self
            .artifacts
            .values()
            .filter(|record| Self::matches(record, query))
            .map(|record| record.id.clone())
            .collect())
    }

    fn query_processes(&self, query: &ProcessQuery) -> Result<Vec<LimsId>, RemoteFetchError> {
        Ok(self
            .processes
            .values()
            .filter(|record| {
                query
                    .process_type
                    .as_deref()
                    .map_or(true, |name| record.process_type.name == name)
            })
            .filter(|record| {
                record.input_output_maps.as_deref().is_some_and(|maps| {
                    maps.iter()
                        .any(|io| query.input_artifact_ids.contains(&io.input.limsid))
                })
            })
            .map(|record| record.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lims_model::{ArtifactType, OutputType, ProcessTypeRef, SampleRef};

    fn id(s: &str) -> LimsId {
        LimsId::new(s).unwrap()
    }

    const EXPORT: &str = r#"{
        "artifacts": [
            {"id": "A1", "type": "Analyte", "samples": [{"id": "S1-id", "name": "S1"}]},
            {"id": "A2", "type": "Analyte", "samples": [{"id": "S1-id", "name": "S1"}], "parent_process": "P1"},
            {"id": "F1", "type": "ResultFile", "samples": [{"id": "S1-id", "name": "S1"}], "parent_process": "P1"}
        ],
        "processes": [
            {"id": "P1", "type": {"id": "7", "name": "Prep"}, "date_run": "2024-03-01",
             "input_output_maps": [
                {"input": {"limsid": "A1"}, "output": {"limsid": "A2", "output_type": "Analyte"}},
                {"input": {"limsid": "A1"}, "output": {"limsid": "F1", "output_type": "ResultFile"}}
             ]}
        ]
    }"#;

    #[test]
    fn parses_export() {
        let service = SnapshotService::from(LabSnapshot::from_json_str(EXPORT).unwrap());
        assert_eq!(service.len(), (3, 1));
        let p1 = service.fetch_process(&id("P1")).unwrap();
        assert_eq!(p1.date_run.unwrap().to_string(), "2024-03-01");
        assert_eq!(
            p1.input_output_maps.unwrap()[1].output.as_ref().unwrap().output_type,
            Some(OutputType::ResultFile)
        );
    }

    #[test]
    fn query_artifacts_filters_sample_and_type() {
        let service = SnapshotService::from(LabSnapshot::from_json_str(EXPORT).unwrap());
        let query = ArtifactQuery::for_sample("S1").with_type(ArtifactType::Analyte);
        assert_eq!(service.query_artifacts(&query).unwrap(), vec![id("A1"), id("A2")]);
        assert!(service
            .query_artifacts(&ArtifactQuery::for_sample("S9"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn query_processes_by_input() {
        let service = SnapshotService::from(LabSnapshot::from_json_str(EXPORT).unwrap());
        assert_eq!(
            service.query_processes(&ProcessQuery::consuming([id("A1")])).unwrap(),
            vec![id("P1")]
        );
        assert!(service
            .query_processes(&ProcessQuery::consuming([id("A2")]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_records_are_not_found() {
        let service = SnapshotService::new();
        assert!(service.is_empty());
        assert!(matches!(
            service.fetch_artifact(&id("nope")),
            Err(RemoteFetchError::NotFound { kind: EntityKind::Artifact, .. })
        ));
    }

    #[test]
    fn insert_replaces_and_exports() {
        let mut service = SnapshotService::new();
        let mut record = ArtifactRecord::analyte(id("A1"));
        service.insert_artifact(record.clone());
        record.samples.push(SampleRef {
            id: id("S1-id"),
            name: "S1".into(),
        });
        service.insert_artifact(record.clone());
        service.insert_process(ProcessRecord::new(
            id("P1"),
            ProcessTypeRef {
                id: id("1"),
                name: "Prep".into(),
            },
        ));

        let snapshot = service.to_snapshot();
        assert_eq!(snapshot.artifacts, vec![record]);
        assert_eq!(snapshot.processes.len(), 1);
    }
}
