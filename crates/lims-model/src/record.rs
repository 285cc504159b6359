//! Entity content records
//!
//! Plain structured data for the two entity kinds of the lineage graph, as
//! returned by the remote service. Records are immutable snapshots; identity
//! and sharing are handled by the session cache.

use crate::id::LimsId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Artifact type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    /// Physical sample-derived specimen
    Analyte,
    /// Per-input result file
    ResultFile,
    /// Any other tag reported by the service, kept verbatim
    #[serde(untagged)]
    Other(String),
}

impl Display for ArtifactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyte => f.write_str("Analyte"),
            Self::ResultFile => f.write_str("ResultFile"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// Output-type tag carried by process outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputType {
    /// Output analyte
    Analyte,
    /// Result file generated per input
    ResultFile,
    /// Result file shared by all inputs
    SharedResultFile,
}

impl Display for OutputType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Analyte => "Analyte",
            Self::ResultFile => "ResultFile",
            Self::SharedResultFile => "SharedResultFile",
        })
    }
}

/// Sample an artifact derives from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRef {
    /// Sample LIMS id
    pub id: LimsId,
    /// Sample name
    pub name: String,
}

/// Artifact content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Artifact LIMS id
    pub id: LimsId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Type tag
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    /// Output-type tag set by the producing process
    #[serde(default)]
    pub output_type: Option<OutputType>,
    /// Samples the artifact derives from
    #[serde(default)]
    pub samples: Vec<SampleRef>,
    /// Producing process; absent for a sample's first artifact
    #[serde(default)]
    pub parent_process: Option<LimsId>,
}

impl ArtifactRecord {
    /// Minimal analyte record with no parent and no samples
    #[must_use]
    pub fn analyte(id: LimsId) -> Self {
        Self {
            id,
            name: String::new(),
            artifact_type: ArtifactType::Analyte,
            output_type: Some(OutputType::Analyte),
            samples: Vec::new(),
            parent_process: None,
        }
    }

    /// Whether any of the artifact's samples carries `sample_name`
    #[must_use]
    pub fn derives_from(&self, sample_name: &str) -> bool {
        self.samples.iter().any(|s| s.name == sample_name)
    }
}

/// Process type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessTypeRef {
    /// Process type id
    pub id: LimsId,
    /// Process type name
    pub name: String,
}

/// One side of an input/output map entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoDescriptor {
    /// Artifact id
    pub limsid: LimsId,
    /// Output-type tag; only set on outputs
    #[serde(default)]
    pub output_type: Option<OutputType>,
}

impl IoDescriptor {
    /// Input side descriptor
    #[inline]
    #[must_use]
    pub fn input(limsid: LimsId) -> Self {
        Self {
            limsid,
            output_type: None,
        }
    }

    /// Output side descriptor
    #[inline]
    #[must_use]
    pub fn output(limsid: LimsId, output_type: OutputType) -> Self {
        Self {
            limsid,
            output_type: Some(output_type),
        }
    }
}

/// Input/output map entry; `output` is `None` when the input produced nothing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoMapEntry {
    /// Consumed artifact
    pub input: IoDescriptor,
    /// Produced artifact, if any
    #[serde(default)]
    pub output: Option<IoDescriptor>,
}

/// Process content
///
/// `input_output_maps` is `None` when the service returned no map at all,
/// which is malformed; `Some(vec![])` is a valid process without I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process LIMS id
    pub id: LimsId,
    /// Process type
    #[serde(rename = "type")]
    pub process_type: ProcessTypeRef,
    /// Run date, if reported
    #[serde(default)]
    pub date_run: Option<NaiveDate>,
    /// Input/output map entries
    #[serde(default)]
    pub input_output_maps: Option<Vec<IoMapEntry>>,
}

impl ProcessRecord {
    /// Record with an empty, well-formed I/O map
    #[must_use]
    pub fn new(id: LimsId, process_type: ProcessTypeRef) -> Self {
        Self {
            id,
            process_type,
            date_run: None,
            input_output_maps: Some(Vec::new()),
        }
    }

    /// Set run date
    #[inline]
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date_run = Some(date);
        self
    }

    /// Append an I/O map entry
    #[must_use]
    pub fn with_io(mut self, input: LimsId, output: Option<(LimsId, OutputType)>) -> Self {
        self.input_output_maps
            .get_or_insert_with(Vec::new)
            .push(IoMapEntry {
                input: IoDescriptor::input(input),
                output: output.map(|(id, ty)| IoDescriptor::output(id, ty)),
            });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LimsId {
        LimsId::new(s).unwrap()
    }

    #[test]
    fn process_builder_appends_entries() {
        let record = ProcessRecord::new(
            id("24-1"),
            ProcessTypeRef {
                id: id("7"),
                name: "Library prep".into(),
            },
        )
        .with_io(id("2-1"), Some((id("2-2"), OutputType::Analyte)))
        .with_io(id("2-1"), None);

        let maps = record.input_output_maps.unwrap();
        assert_eq!(maps.len(), 2);
        assert!(maps[1].output.is_none());
    }

    #[test]
    fn process_without_map_deserializes_as_none() {
        let json = r#"{"id":"24-9","type":{"id":"3","name":"QC"}}"#;
        let record: ProcessRecord = serde_json::from_str(json).unwrap();
        assert!(record.input_output_maps.is_none());
        assert!(record.date_run.is_none());
    }

    #[test]
    fn artifact_derives_from_sample_name() {
        let mut record = ArtifactRecord::analyte(id("2-1"));
        record.samples.push(SampleRef {
            id: id("P1-S1"),
            name: "S1".into(),
        });
        assert!(record.derives_from("S1"));
        assert!(!record.derives_from("S2"));
    }

    #[test]
    fn unknown_artifact_type_is_kept_verbatim() {
        let json = r#"{"id":"2-7","type":"Pool"}"#;
        let record: ArtifactRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.artifact_type, ArtifactType::Other("Pool".into()));
        assert_eq!(serde_json::to_value(&record).unwrap()["type"], "Pool");

        let known: ArtifactRecord = serde_json::from_str(r#"{"id":"2-8","type":"ResultFile"}"#).unwrap();
        assert_eq!(known.artifact_type, ArtifactType::ResultFile);
    }

    #[test]
    fn artifact_type_display() {
        assert_eq!(ArtifactType::Analyte.to_string(), "Analyte");
        assert_eq!(ArtifactType::Other("Pool".into()).to_string(), "Pool");
        assert_eq!(OutputType::SharedResultFile.to_string(), "SharedResultFile");
    }
}
