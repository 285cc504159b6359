//! Sample history reconstruction
//!
//! Walks backwards from a target artifact to the sample root, recording at
//! every chain artifact all the processes that consumed it. Two walks are
//! offered:
//!
//! - [`SampleHistory::reconstruct`] follows parent processes live, checking
//!   membership in the sample's analyte set at every step.
//! - [`SampleHistory::reconstruct_sorted`] follows a precomputed
//!   [`SampleArtifactMap`] and makes no remote calls for chain links.
//!
//! In both, a process on the chain is the only one whose step carries an
//! output artifact. Consumer lookups use the [`LocalProcessIndex`] when one
//! is supplied and the remote service otherwise.
//!
//! When a process consumed several artifacts of the same sample, only the
//! first (in I/O map order) is followed; the others do not appear on the
//! chain.

use crate::artifact_map::SampleArtifactMap;
use crate::error::{HistoryError, HistoryResult};
use crate::history::{History, HistoryStep};
use crate::index::LocalProcessIndex;
use indexmap::IndexSet;
use lims_model::LimsId;
use lims_session::{Artifact, Process, Session};

/// How the on-chain consumer of an artifact is recognised
#[derive(Debug, Clone, Copy)]
enum OnChain<'a> {
    /// The consumer with this process id
    Process(&'a LimsId),
    /// Any consumer whose outputs include this artifact
    Producing(&'a LimsId),
}

/// Builder for [`SampleHistory`]
#[derive(Debug)]
pub struct SampleHistoryBuilder<'a> {
    session: Option<&'a Session>,
    sample_name: String,
    process_index: Option<&'a LocalProcessIndex>,
}

impl<'a> SampleHistoryBuilder<'a> {
    /// Session used for every load and query
    #[must_use]
    pub fn session(mut self, session: &'a Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Answer consumer lookups from `index` instead of the remote service
    #[must_use]
    pub fn process_index(mut self, index: &'a LocalProcessIndex) -> Self {
        self.process_index = Some(index);
        self
    }

    /// Finish the builder
    ///
    /// # Errors
    /// Returns [`HistoryError::MissingHistoryContext`] if no session was set
    pub fn build(self) -> HistoryResult<SampleHistory<'a>> {
        let session = self.session.ok_or(HistoryError::MissingHistoryContext)?;
        Ok(SampleHistory {
            session,
            sample_name: self.sample_name,
            process_index: self.process_index,
        })
    }
}

/// History reconstructor for one sample
///
/// Holds only borrowed context; every call returns a fresh [`History`].
#[derive(Debug, Clone)]
pub struct SampleHistory<'a> {
    session: &'a Session,
    sample_name: String,
    process_index: Option<&'a LocalProcessIndex>,
}

impl<'a> SampleHistory<'a> {
    /// Start building a reconstructor for `sample_name`
    #[must_use]
    pub fn builder(sample_name: impl Into<String>) -> SampleHistoryBuilder<'a> {
        SampleHistoryBuilder {
            session: None,
            sample_name: sample_name.into(),
            process_index: None,
        }
    }

    /// Sample being reconstructed
    #[inline]
    #[must_use]
    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    /// Whether consumer lookups are answered locally
    #[inline]
    #[must_use]
    pub fn uses_local_index(&self) -> bool {
        self.process_index.is_some()
    }

    /// Precompute the sample's artifact map for [`Self::reconstruct_sorted`]
    ///
    /// # Errors
    /// Returns error if a load fails or a parent process has no I/O map
    pub fn artifact_map(&self) -> HistoryResult<SampleArtifactMap> {
        Ok(SampleArtifactMap::build(self.session, &self.sample_name)?)
    }

    /// Walk parent processes from `output` back to the sample root
    ///
    /// With `input`, the walk starts from that artifact: its consumers are
    /// recorded first (tagging the one that produced `output`) and it heads
    /// the chain.
    ///
    /// # Errors
    /// Returns error if a load or query fails, or a process on the walk has
    /// no I/O map
    pub fn reconstruct(&self, output: &LimsId, input: Option<&LimsId>) -> HistoryResult<History> {
        let artifacts = self.session.sample_analytes(&self.sample_name, true)?;
        self.reconstruct_with_artifacts(&artifacts, output, input)
    }

    /// [`Self::reconstruct`] over an already fetched sample artifact set
    ///
    /// # Errors
    /// Returns error if a load or query fails, or a process on the walk has
    /// no I/O map
    pub fn reconstruct_with_artifacts(
        &self,
        sample_artifacts: &[Artifact],
        output: &LimsId,
        input: Option<&LimsId>,
    ) -> HistoryResult<History> {
        let members: IndexSet<LimsId> = sample_artifacts.iter().map(|a| a.id().clone()).collect();
        let mut history = History::new();
        let mut current = self.seed(&mut history, output, input)?;

        let mut steps = 0;
        loop {
            if !members.contains(&current) {
                break;
            }
            if steps >= members.len() {
                tracing::warn!(
                    sample = %self.sample_name,
                    artifact = %current,
                    bound = members.len(),
                    "walk bound reached; lineage is cyclic"
                );
                break;
            }
            steps += 1;

            let Some(parent) = self.session.artifact(&current).parent_process(self.session)? else {
                break;
            };
            let next = parent
                .all_inputs(self.session, true)?
                .into_iter()
                .map(|a| a.id().clone())
                .find(|id| members.contains(id));
            let Some(next) = next else {
                tracing::debug!(artifact = %current, process = %parent.id(), "no same-sample input");
                break;
            };

            tracing::debug!(artifact = %current, process = %parent.id(), input = %next, "chain step");
            self.record_consumers(&mut history, &next, &current, OnChain::Process(parent.id()))?;
            history.push_chain(next.clone());
            current = next;
        }

        tracing::info!(
            sample = %self.sample_name,
            target = %output,
            chain_len = history.chain().len(),
            "reconstructed history"
        );
        Ok(history)
    }

    /// Walk `map` from `output` back to the sample root
    ///
    /// Chain links come from the map only; an incomplete map yields a short
    /// history.
    ///
    /// # Errors
    /// Returns error if a consumer lookup or process load fails
    pub fn reconstruct_sorted(
        &self,
        map: &SampleArtifactMap,
        output: &LimsId,
        input: Option<&LimsId>,
    ) -> HistoryResult<History> {
        let mut history = History::new();
        let mut current = self.seed(&mut history, output, input)?;

        let mut steps = 0;
        while let Some(link) = map.get(&current) {
            if steps >= map.len() {
                tracing::warn!(
                    sample = %self.sample_name,
                    artifact = %current,
                    bound = map.len(),
                    "walk bound reached; artifact map is cyclic"
                );
                break;
            }
            steps += 1;

            tracing::debug!(artifact = %current, process = %link.process.id(), input = %link.input, "chain step");
            history.push_chain(link.input.clone());
            self.record_consumers(&mut history, &link.input, &current, OnChain::Producing(&current))?;
            current = link.input.clone();
        }

        tracing::info!(
            sample = %self.sample_name,
            target = %output,
            chain_len = history.chain().len(),
            "reconstructed sorted history"
        );
        Ok(history)
    }

    /// Record the seed input, if any, and return the walk's start
    fn seed(&self, history: &mut History, output: &LimsId, input: Option<&LimsId>) -> HistoryResult<LimsId> {
        let Some(seed) = input else {
            return Ok(output.clone());
        };
        self.record_consumers(history, seed, output, OnChain::Producing(output))?;
        history.push_chain(seed.clone());
        Ok(seed.clone())
    }

    /// Processes that consumed `input`
    fn consumers(&self, input: &LimsId) -> HistoryResult<Vec<Process>> {
        match self.process_index {
            Some(index) => Ok(index.consumers(input).to_vec()),
            None => Ok(self.session.get_processes(input)?),
        }
    }

    /// Record one step per consumer of `input`
    ///
    /// Only the consumer matching `on_chain` gets `output` as its step output.
    fn record_consumers(
        &self,
        history: &mut History,
        input: &LimsId,
        output: &LimsId,
        on_chain: OnChain<'_>,
    ) -> HistoryResult<()> {
        let consumers = self.session.get_batch(&self.consumers(input)?, false)?;
        for process in consumers {
            let tagged = match on_chain {
                OnChain::Process(id) => process.id() == id,
                OnChain::Producing(artifact) => process
                    .output_ids(self.session, true, |_| true)?
                    .contains(artifact),
            };
            let record = self.session.load(&process, false)?;
            history.record(HistoryStep::new(
                &record,
                input.clone(),
                tagged.then(|| output.clone()),
            ));
        }
        Ok(())
    }
}
