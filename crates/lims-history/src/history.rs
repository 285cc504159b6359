//! Reconstructed history
//!
//! A [`History`] holds one [`HistoryStep`] per `(input artifact, consumer
//! process)` pair seen during a walk, plus the ordered chain of artifacts
//! the walk went through. Steps for processes that are not on the chain
//! (QC, side measurements) carry no output artifact.

use chrono::NaiveDate;
use indexmap::IndexMap;
use lims_model::{LimsId, ProcessRecord};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// One process applied to one input artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStep {
    /// Run date of the process, if reported
    pub date: Option<NaiveDate>,
    /// Consuming process
    pub process_id: LimsId,
    /// Process type id
    pub process_type_id: LimsId,
    /// Process type name
    pub process_type_name: String,
    /// Artifact the process consumed
    pub input_artifact_id: LimsId,
    /// Next chain artifact; set only when the process is the on-chain one
    pub output_artifact_id: Option<LimsId>,
}

impl HistoryStep {
    /// Step for `process` consuming `input`
    #[must_use]
    pub fn new(process: &ProcessRecord, input: LimsId, output: Option<LimsId>) -> Self {
        Self {
            date: process.date_run,
            process_id: process.id.clone(),
            process_type_id: process.process_type.id.clone(),
            process_type_name: process.process_type.name.clone(),
            input_artifact_id: input,
            output_artifact_id: output,
        }
    }

    /// Whether the step links two chain artifacts
    #[inline]
    #[must_use]
    pub fn is_on_chain(&self) -> bool {
        self.output_artifact_id.is_some()
    }
}

/// Steps keyed by input artifact then process, plus the walked chain
///
/// The chain lists artifacts from the target's predecessor back to the
/// sample root. Iteration over steps follows first-recorded order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    steps: IndexMap<LimsId, IndexMap<LimsId, HistoryStep>>,
    chain: Vec<LimsId>,
}

impl History {
    /// Create empty history
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step, replacing any earlier one for the same pair
    pub(crate) fn record(&mut self, step: HistoryStep) {
        self.steps
            .entry(step.input_artifact_id.clone())
            .or_default()
            .insert(step.process_id.clone(), step);
    }

    /// Append to the chain unless it repeats the last entry
    ///
    /// Returns false if the artifact was not appended.
    pub(crate) fn push_chain(&mut self, artifact: LimsId) -> bool {
        if self.chain.last() == Some(&artifact) {
            return false;
        }
        self.chain.push(artifact);
        true
    }

    /// Walked artifacts, nearest first
    #[inline]
    #[must_use]
    pub fn chain(&self) -> &[LimsId] {
        &self.chain
    }

    /// All steps recorded for `artifact`, keyed by process id
    #[must_use]
    pub fn steps_for(&self, artifact: &LimsId) -> Option<&IndexMap<LimsId, HistoryStep>> {
        self.steps.get(artifact)
    }

    /// Step for one `(artifact, process)` pair
    #[must_use]
    pub fn step(&self, artifact: &LimsId, process: &LimsId) -> Option<&HistoryStep> {
        self.steps.get(artifact)?.get(process)
    }

    /// The step that carried `artifact` to the next chain entry
    #[must_use]
    pub fn on_chain_step(&self, artifact: &LimsId) -> Option<&HistoryStep> {
        self.steps.get(artifact)?.values().find(|s| s.is_on_chain())
    }

    /// Artifacts with recorded steps
    pub fn artifacts(&self) -> impl Iterator<Item = &LimsId> {
        self.steps.keys()
    }

    /// Every recorded step
    pub fn iter_steps(&self) -> impl Iterator<Item = &HistoryStep> {
        self.steps.values().flat_map(IndexMap::values)
    }

    /// Number of recorded steps
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.values().map(IndexMap::len).sum()
    }

    /// No chain and no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty() && self.steps.is_empty()
    }

    /// Dump the history at `info` level
    pub fn log_summary(&self, sample_name: &str) {
        tracing::info!(
            sample = sample_name,
            chain_len = self.chain.len(),
            steps = self.step_count(),
            "history summary"
        );
        for artifact in &self.chain {
            let Some(steps) = self.steps.get(artifact) else {
                continue;
            };
            for step in steps.values() {
                tracing::info!(
                    artifact = %artifact,
                    process = %step.process_id,
                    process_type = %step.process_type_name,
                    date = ?step.date,
                    output = ?step.output_artifact_id,
                    "history step"
                );
            }
        }
    }
}

impl Display for History {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for artifact in &self.chain {
            writeln!(f, "{artifact}")?;
            let Some(steps) = self.steps.get(artifact) else {
                continue;
            };
            for step in steps.values() {
                let date = step
                    .date
                    .map_or_else(|| "-".to_string(), |d| d.to_string());
                match &step.output_artifact_id {
                    Some(output) => writeln!(
                        f,
                        "  {date}  {} ({}) -> {output}",
                        step.process_id, step.process_type_name
                    )?,
                    None => writeln!(f, "  {date}  {} ({})", step.process_id, step.process_type_name)?,
                }
            }
        }
        Ok(())
    }
}
