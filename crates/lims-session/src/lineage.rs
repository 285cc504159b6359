//! Lineage graph accessors
//!
//! Read-only queries over artifact and process handles. Content is loaded
//! through the session on first access; afterwards every query is answered
//! from the attached record.

use crate::entity::{Artifact, Process};
use crate::error::{SessionError, SessionResult};
use crate::session::Session;
use indexmap::IndexSet;
use lims_model::{ArtifactType, IoMapEntry, LimsId, OutputType, SampleRef};

/// Which side of a process [`Process::analytes`] answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyteSide {
    /// The process produced analytes
    Output,
    /// The process produced none; its input analytes were returned
    Input,
}

/// Collect ids, deduplicating on first occurrence when `unique`
fn collect_ids<'a>(ids: impl Iterator<Item = &'a LimsId>, unique: bool) -> Vec<LimsId> {
    if unique {
        ids.cloned().collect::<IndexSet<_>>().into_iter().collect()
    } else {
        ids.cloned().collect()
    }
}

impl Artifact {
    /// Process that produced this artifact, if any
    ///
    /// # Errors
    /// Returns error if the artifact cannot be loaded
    pub fn parent_process(&self, session: &Session) -> SessionResult<Option<Process>> {
        let record = session.load(self, false)?;
        Ok(record.parent_process.as_ref().map(|id| session.process(id)))
    }

    /// Samples this artifact derives from
    ///
    /// # Errors
    /// Returns error if the artifact cannot be loaded
    pub fn samples(&self, session: &Session) -> SessionResult<Vec<SampleRef>> {
        Ok(session.load(self, false)?.samples.clone())
    }

    /// Artifact type tag
    ///
    /// # Errors
    /// Returns error if the artifact cannot be loaded
    pub fn artifact_type(&self, session: &Session) -> SessionResult<ArtifactType> {
        Ok(session.load(self, false)?.artifact_type.clone())
    }

    /// Inputs of the parent process that map to this artifact
    ///
    /// Empty when the artifact has no parent process.
    ///
    /// # Errors
    /// Returns error if the artifact or its parent cannot be loaded, or the
    /// parent has no input/output map
    pub fn input_artifact_list(&self, session: &Session) -> SessionResult<Vec<Artifact>> {
        let Some(parent) = self.parent_process(session)? else {
            return Ok(Vec::new());
        };
        let maps = parent.io_map(session)?;
        let ids = maps
            .iter()
            .filter(|io| io.output.as_ref().is_some_and(|out| &out.limsid == self.id()))
            .map(|io| &io.input.limsid);
        Ok(collect_ids(ids, false)
            .iter()
            .map(|id| session.artifact(id))
            .collect())
    }
}

impl Process {
    /// Input/output map entries
    ///
    /// # Errors
    /// Returns [`SessionError::MalformedProcess`] if the process has no map
    pub fn io_map(&self, session: &Session) -> SessionResult<Vec<IoMapEntry>> {
        let record = session.load(self, false)?;
        record.input_output_maps.clone().ok_or_else(|| {
            tracing::error!(process = %self.id(), "process has no input artifacts");
            SessionError::malformed_process(self.id())
        })
    }

    /// All input artifacts
    ///
    /// With `unique`, duplicates are dropped keeping first occurrence.
    ///
    /// # Errors
    /// Returns [`SessionError::MalformedProcess`] if the process has no map
    pub fn all_inputs(&self, session: &Session, unique: bool) -> SessionResult<Vec<Artifact>> {
        let maps = self.io_map(session)?;
        let ids = collect_ids(maps.iter().map(|io| &io.input.limsid), unique);
        Ok(ids.iter().map(|id| session.artifact(id)).collect())
    }

    /// All output artifacts, skipping entries without output
    ///
    /// A process without an input/output map has no outputs.
    ///
    /// # Errors
    /// Returns error if the process cannot be loaded
    pub fn all_outputs(&self, session: &Session, unique: bool) -> SessionResult<Vec<Artifact>> {
        Ok(self
            .output_ids(session, unique, |_| true)?
            .iter()
            .map(|id| session.artifact(id))
            .collect())
    }

    /// Ids of outputs whose descriptor satisfies `filter`
    ///
    /// # Errors
    /// Returns error if the process cannot be loaded
    pub fn output_ids(
        &self,
        session: &Session,
        unique: bool,
        filter: impl Fn(&IoMapEntry) -> bool,
    ) -> SessionResult<Vec<LimsId>> {
        let record = session.load(self, false)?;
        let Some(maps) = record.input_output_maps.as_deref() else {
            return Ok(Vec::new());
        };
        let ids = maps
            .iter()
            .filter(|io| filter(*io))
            .filter_map(|io| io.output.as_ref().map(|out| &out.limsid));
        Ok(collect_ids(ids, unique))
    }

    /// Outputs produced from one input, optionally restricted to an output type
    ///
    /// # Errors
    /// Returns error if the process cannot be loaded
    pub fn outputs_per_input(
        &self,
        session: &Session,
        input: &LimsId,
        output_type: Option<OutputType>,
    ) -> SessionResult<Vec<Artifact>> {
        let ids = self.output_ids(session, false, |io| {
            &io.input.limsid == input
                && output_type.map_or(true, |wanted| {
                    io.output.as_ref().and_then(|o| o.output_type) == Some(wanted)
                })
        })?;
        Ok(ids.iter().map(|id| session.artifact(id)).collect())
    }

    /// Inputs deriving from the named sample
    ///
    /// Loads the inputs in one batch call.
    ///
    /// # Errors
    /// Returns error if the process or its inputs cannot be loaded
    pub fn input_per_sample(&self, session: &Session, sample_name: &str) -> SessionResult<Vec<Artifact>> {
        let inputs = session.get_batch(&self.all_inputs(session, true)?, false)?;
        Ok(inputs
            .into_iter()
            .filter(|art| {
                art.content()
                    .is_some_and(|record| record.derives_from(sample_name))
            })
            .collect())
    }

    /// Outputs of type `ResultFile` (one per input)
    ///
    /// # Errors
    /// Returns error if the process cannot be loaded
    pub fn result_files(&self, session: &Session) -> SessionResult<Vec<Artifact>> {
        self.outputs_of_type(session, OutputType::ResultFile)
    }

    /// Outputs of type `SharedResultFile` (one for all inputs)
    ///
    /// # Errors
    /// Returns error if the process cannot be loaded
    pub fn shared_result_files(&self, session: &Session) -> SessionResult<Vec<Artifact>> {
        self.outputs_of_type(session, OutputType::SharedResultFile)
    }

    fn outputs_of_type(&self, session: &Session, wanted: OutputType) -> SessionResult<Vec<Artifact>> {
        let ids = self.output_ids(session, true, |io| {
            io.output.as_ref().and_then(|o| o.output_type) == Some(wanted)
        })?;
        Ok(ids.iter().map(|id| session.artifact(id)).collect())
    }

    /// Output analytes, or the input analytes when the process produced none
    ///
    /// Makes aggregate (QC-style) processes and regular ones look the same.
    ///
    /// # Errors
    /// Returns error if the process or its inputs cannot be loaded
    pub fn analytes(&self, session: &Session) -> SessionResult<(Vec<Artifact>, AnalyteSide)> {
        let outputs = self.outputs_of_type(session, OutputType::Analyte)?;
        if !outputs.is_empty() {
            return Ok((outputs, AnalyteSide::Output));
        }
        let inputs = session.get_batch(&self.all_inputs(session, true)?, false)?;
        let analytes = inputs
            .into_iter()
            .filter(|art| {
                art.content()
                    .is_some_and(|record| record.artifact_type == ArtifactType::Analyte)
            })
            .collect();
        Ok((analytes, AnalyteSide::Input))
    }

    /// Distinct parent processes of the inputs
    ///
    /// Inputs without a parent (sample roots) contribute nothing.
    ///
    /// # Errors
    /// Returns error if the process or an input cannot be loaded
    pub fn parent_processes(&self, session: &Session) -> SessionResult<Vec<Process>> {
        let mut parents = IndexSet::new();
        for input in self.all_inputs(session, true)? {
            if let Some(parent) = input.parent_process(session)? {
                parents.insert(parent);
            }
        }
        Ok(parents.into_iter().collect())
    }
}
