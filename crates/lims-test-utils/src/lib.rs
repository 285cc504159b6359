//! Testing utilities for the LIMS lineage workspace
//!
//! Shared record builders, lineage fixtures and a call-counting service.

#![allow(missing_docs)]

use chrono::NaiveDate;
use lims_model::{
    ArtifactQuery, ArtifactRecord, ArtifactType, LimsId, OutputType, ProcessQuery, ProcessRecord,
    ProcessTypeRef, RemoteFetchError, SampleRef,
};
use lims_session::{LimsService, Session, SessionConfig, SnapshotService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sample name used by every fixture
pub const SAMPLE: &str = "S1";

pub fn id(s: &str) -> LimsId {
    LimsId::new(s).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn sample_ref(sample: &str) -> SampleRef {
    SampleRef {
        id: id(&format!("{sample}-id")),
        name: sample.to_string(),
    }
}

pub fn analyte(artifact: &str, sample: &str, parent: Option<&str>) -> ArtifactRecord {
    let mut record = ArtifactRecord::analyte(id(artifact));
    record.name = artifact.to_lowercase();
    record.samples.push(sample_ref(sample));
    record.parent_process = parent.map(id);
    record
}

pub fn result_file(artifact: &str, sample: &str, parent: &str) -> ArtifactRecord {
    ArtifactRecord {
        artifact_type: ArtifactType::ResultFile,
        output_type: Some(OutputType::ResultFile),
        ..analyte(artifact, sample, Some(parent))
    }
}

pub fn process(process: &str, type_name: &str) -> ProcessRecord {
    ProcessRecord::new(
        id(process),
        ProcessTypeRef {
            id: id(&format!("type-{}", type_name.to_lowercase().replace(' ', "-"))),
            name: type_name.to_string(),
        },
    )
}

/// Incremental [`SnapshotService`] builder
#[derive(Debug, Default)]
pub struct LabBuilder {
    service: SnapshotService,
}

impl LabBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact(mut self, record: ArtifactRecord) -> Self {
        self.service.insert_artifact(record);
        self
    }

    pub fn process(mut self, record: ProcessRecord) -> Self {
        self.service.insert_process(record);
        self
    }

    pub fn build(self) -> SnapshotService {
        self.service
    }
}

/// `A1 → P1 → A2 → … → P(n-1) → An`, all analytes of [`SAMPLE`]
///
/// Process `Pi` runs on day `i` and maps `Ai` to `A(i+1)`.
pub fn linear_chain(n: usize) -> SnapshotService {
    let mut lab = LabBuilder::new();
    for i in 1..=n {
        let parent = (i > 1).then(|| format!("P{}", i - 1));
        lab = lab.artifact(analyte(&format!("A{i}"), SAMPLE, parent.as_deref()));
    }
    for i in 1..n {
        let step = u32::try_from(i % 28 + 1).unwrap();
        lab = lab.process(
            process(&format!("P{i}"), "Prep")
                .with_date(date(step))
                .with_io(id(&format!("A{i}")), Some((id(&format!("A{}", i + 1)), OutputType::Analyte))),
        );
    }
    lab.build()
}

/// Three-step chain with a QC side use of the root
///
/// `A1 → P1 → A2 → P2 → A3`; `QC` consumes `A1` and produces only a
/// per-input result file `F1`. `A1` also carries a result file from `P1`.
pub fn qc_side_use() -> SnapshotService {
    LabBuilder::new()
        .artifact(analyte("A1", SAMPLE, None))
        .artifact(analyte("A2", SAMPLE, Some("P1")))
        .artifact(analyte("A3", SAMPLE, Some("P2")))
        .artifact(result_file("F1", SAMPLE, "QC"))
        .process(
            process("P1", "Library prep")
                .with_date(date(1))
                .with_io(id("A1"), Some((id("A2"), OutputType::Analyte))),
        )
        .process(
            process("P2", "Sequencing")
                .with_date(date(3))
                .with_io(id("A2"), Some((id("A3"), OutputType::Analyte))),
        )
        .process(
            process("QC", "Quant")
                .with_date(date(2))
                .with_io(id("A1"), Some((id("F1"), OutputType::ResultFile))),
        )
        .build()
}

/// Two root analytes of [`SAMPLE`] pooled by `P1` into `A2`
///
/// Only the first same-sample input (`A1a`) is followed back.
pub fn pooled_inputs() -> SnapshotService {
    LabBuilder::new()
        .artifact(analyte("A1a", SAMPLE, None))
        .artifact(analyte("A1b", SAMPLE, None))
        .artifact(analyte("B1", "S2", None))
        .artifact(analyte("A2", SAMPLE, Some("P1")))
        .process(
            process("P1", "Pooling")
                .with_date(date(5))
                .with_io(id("B1"), Some((id("A2"), OutputType::Analyte)))
                .with_io(id("A1a"), Some((id("A2"), OutputType::Analyte)))
                .with_io(id("A1b"), Some((id("A2"), OutputType::Analyte))),
        )
        .build()
}

/// Calls made through a [`CountingService`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub artifact_fetches: usize,
    pub process_fetches: usize,
    pub artifact_queries: usize,
    pub process_queries: usize,
}

impl CallCounts {
    pub fn remote_total(&self) -> usize {
        self.artifact_fetches + self.process_fetches + self.artifact_queries + self.process_queries
    }
}

/// Wraps a service and counts every call
#[derive(Debug, Default)]
pub struct CountingService<S> {
    inner: S,
    artifact_fetches: AtomicUsize,
    process_fetches: AtomicUsize,
    artifact_queries: AtomicUsize,
    process_queries: AtomicUsize,
}

impl<S: LimsService> CountingService<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            artifact_fetches: AtomicUsize::new(0),
            process_fetches: AtomicUsize::new(0),
            artifact_queries: AtomicUsize::new(0),
            process_queries: AtomicUsize::new(0),
        }
    }

    pub fn counts(&self) -> CallCounts {
        CallCounts {
            artifact_fetches: self.artifact_fetches.load(Ordering::SeqCst),
            process_fetches: self.process_fetches.load(Ordering::SeqCst),
            artifact_queries: self.artifact_queries.load(Ordering::SeqCst),
            process_queries: self.process_queries.load(Ordering::SeqCst),
        }
    }
}

impl<S: LimsService> LimsService for CountingService<S> {
    fn fetch_artifact(&self, id: &LimsId) -> Result<ArtifactRecord, RemoteFetchError> {
        self.artifact_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_artifact(id)
    }

    fn fetch_process(&self, id: &LimsId) -> Result<ProcessRecord, RemoteFetchError> {
        self.process_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_process(id)
    }

    fn query_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<LimsId>, RemoteFetchError> {
        self.artifact_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_artifacts(query)
    }

    fn query_processes(&self, query: &ProcessQuery) -> Result<Vec<LimsId>, RemoteFetchError> {
        self.process_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_processes(query)
    }
}

/// Session over `service` with default configuration
pub fn session_over(service: SnapshotService) -> Session {
    Session::with_service(Arc::new(service))
}

/// Session plus the counter wrapping its service
pub fn counting_session(
    service: SnapshotService,
    config: SessionConfig,
) -> (Session, Arc<CountingService<SnapshotService>>) {
    let counting = Arc::new(CountingService::new(service));
    let session = Session::new(counting.clone(), config);
    (session, counting)
}
