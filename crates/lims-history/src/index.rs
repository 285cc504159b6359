//! Local process index
//!
//! Caller-supplied map from artifact id to the processes that consumed it.
//! When a reconstructor is given an index, consumer lookups are answered
//! from it and never reach the remote service. The index is a snapshot:
//! nothing in this crate refreshes it.

use indexmap::IndexMap;
use lims_model::LimsId;
use lims_session::{Process, Session, SessionResult};

/// Artifact id to consuming processes
#[derive(Debug, Clone, Default)]
pub struct LocalProcessIndex {
    by_input: IndexMap<LimsId, Vec<Process>>,
}

impl LocalProcessIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `process` as a consumer of `input`
    ///
    /// A process is registered at most once per input.
    pub fn insert(&mut self, input: LimsId, process: Process) {
        let consumers = self.by_input.entry(input).or_default();
        if !consumers.iter().any(|p| p.id() == process.id()) {
            consumers.push(process);
        }
    }

    /// Build from processes, registering each under every one of its inputs
    ///
    /// All processes are loaded with one batch call first.
    ///
    /// # Errors
    /// Returns error if loading fails or a process has no I/O map
    pub fn from_processes(session: &Session, processes: &[Process]) -> SessionResult<Self> {
        let mut index = Self::new();
        for process in session.get_batch(processes, false)? {
            for input in process.all_inputs(session, true)? {
                index.insert(input.id().clone(), process.clone());
            }
        }
        tracing::debug!(artifacts = index.len(), "built local process index");
        Ok(index)
    }

    /// Consumers of `input`; empty when the id is not indexed
    #[must_use]
    pub fn consumers(&self, input: &LimsId) -> &[Process] {
        self.by_input.get(input).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `input` has an entry
    #[inline]
    #[must_use]
    pub fn contains(&self, input: &LimsId) -> bool {
        self.by_input.contains_key(input)
    }

    /// Number of indexed artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_input.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_input.is_empty()
    }

    /// Indexed artifact ids in insertion order
    pub fn artifact_ids(&self) -> impl Iterator<Item = &LimsId> {
        self.by_input.keys()
    }
}

impl FromIterator<(LimsId, Vec<Process>)> for LocalProcessIndex {
    fn from_iter<T: IntoIterator<Item = (LimsId, Vec<Process>)>>(iter: T) -> Self {
        let mut index = Self::new();
        for (input, processes) in iter {
            for process in processes {
                index.insert(input.clone(), process);
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lims_test_utils::{id, qc_side_use, session_over};

    #[test]
    fn from_processes_registers_every_input() {
        let session = session_over(qc_side_use());
        let processes = [session.process(&id("P1")), session.process(&id("QC")), session.process(&id("P2"))];
        let index = LocalProcessIndex::from_processes(&session, &processes).unwrap();

        let a1: Vec<_> = index.consumers(&id("A1")).iter().map(|p| p.id().as_str()).collect();
        assert_eq!(a1, ["P1", "QC"]);
        assert_eq!(index.consumers(&id("A2")).len(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn missing_id_has_no_consumers() {
        let index = LocalProcessIndex::new();
        assert!(index.is_empty());
        assert!(index.consumers(&id("A9")).is_empty());
        assert!(!index.contains(&id("A9")));
    }

    #[test]
    fn insert_ignores_duplicate_process() {
        let session = session_over(qc_side_use());
        let p1 = session.process(&id("P1"));
        let index: LocalProcessIndex = [(id("A1"), vec![p1.clone(), p1])].into_iter().collect();
        assert_eq!(index.consumers(&id("A1")).len(), 1);
        assert_eq!(index.artifact_ids().count(), 1);
    }
}
