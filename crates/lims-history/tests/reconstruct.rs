//! End-to-end history reconstruction over in-memory lab fixtures

use lims_history::{HistoryError, LocalProcessIndex, SampleArtifactMap, SampleHistory};
use lims_model::OutputType;
use lims_session::{Session, SessionConfig};
use lims_test_utils::{
    analyte, counting_session, date, id, linear_chain, pooled_inputs, process, qc_side_use,
    session_over, LabBuilder, SAMPLE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn reconstructor(session: &Session) -> SampleHistory<'_> {
    SampleHistory::builder(SAMPLE).session(session).build().unwrap()
}

#[test]
fn alternate_walk_follows_chain_to_root() {
    let session = session_over(qc_side_use());
    let history = reconstructor(&session).reconstruct(&id("A3"), None).unwrap();

    assert_eq!(history.chain(), [id("A2"), id("A1")]);
    assert_eq!(
        history.step(&id("A1"), &id("P1")).unwrap().output_artifact_id,
        Some(id("A2"))
    );
    assert_eq!(
        history.step(&id("A2"), &id("P2")).unwrap().output_artifact_id,
        Some(id("A3"))
    );
    let p2 = history.step(&id("A2"), &id("P2")).unwrap();
    assert_eq!(p2.process_type_name, "Sequencing");
    assert_eq!(p2.date, Some(date(3)));
}

#[test]
fn off_chain_consumer_is_recorded_without_output() {
    let session = session_over(qc_side_use());
    let history = reconstructor(&session).reconstruct(&id("A3"), None).unwrap();

    let a1 = history.steps_for(&id("A1")).unwrap();
    assert_eq!(a1.len(), 2);
    assert_eq!(a1[&id("QC")].output_artifact_id, None);
    assert_eq!(a1[&id("P1")].output_artifact_id, Some(id("A2")));
}

#[test]
fn sorted_walk_matches_alternate_walk() {
    let session = session_over(qc_side_use());
    let reconstructor = reconstructor(&session);
    let map = reconstructor.artifact_map().unwrap();

    let sorted = reconstructor.reconstruct_sorted(&map, &id("A3"), None).unwrap();
    let alternate = reconstructor.reconstruct(&id("A3"), None).unwrap();

    assert_eq!(sorted.chain(), alternate.chain());
    assert_eq!(
        sorted.step(&id("A1"), &id("QC")),
        alternate.step(&id("A1"), &id("QC"))
    );
    assert_eq!(sorted.on_chain_step(&id("A2")).unwrap().process_id, id("P2"));
}

#[test]
fn sorted_walk_over_empty_map_is_empty() {
    let session = session_over(qc_side_use());
    let history = reconstructor(&session)
        .reconstruct_sorted(&SampleArtifactMap::new(), &id("A3"), None)
        .unwrap();
    assert!(history.chain().is_empty());
    assert!(history.is_empty());
}

#[test]
fn sorted_walk_with_partial_map_stops_early() {
    let session = session_over(qc_side_use());
    let mut map = SampleArtifactMap::new();
    map.insert(id("A3"), session.process(&id("P2")), id("A2"));

    let history = reconstructor(&session).reconstruct_sorted(&map, &id("A3"), None).unwrap();
    assert_eq!(history.chain(), [id("A2")]);
    assert!(history.steps_for(&id("A1")).is_none());
}

#[test]
fn seed_input_heads_the_chain() {
    let session = session_over(qc_side_use());
    // F1 is a result file produced by QC from A1
    let history = reconstructor(&session)
        .reconstruct(&id("F1"), Some(&id("A1")))
        .unwrap();

    assert_eq!(history.chain(), [id("A1")]);
    assert_eq!(
        history.step(&id("A1"), &id("QC")).unwrap().output_artifact_id,
        Some(id("F1"))
    );
    assert_eq!(history.step(&id("A1"), &id("P1")).unwrap().output_artifact_id, None);
}

#[test]
fn seed_input_in_sorted_walk() {
    let session = session_over(qc_side_use());
    let reconstructor = reconstructor(&session);
    let map = reconstructor.artifact_map().unwrap();
    let history = reconstructor
        .reconstruct_sorted(&map, &id("A3"), Some(&id("A2")))
        .unwrap();

    assert_eq!(history.chain(), [id("A2"), id("A1")]);
    assert_eq!(history.on_chain_step(&id("A2")).unwrap().process_id, id("P2"));
}

#[test]
fn only_first_same_sample_input_is_followed() {
    let session = session_over(pooled_inputs());
    let history = reconstructor(&session).reconstruct(&id("A2"), None).unwrap();

    // A1b was pooled into A2 as well but never appears on the chain
    assert_eq!(history.chain(), [id("A1a")]);
    assert!(history.steps_for(&id("A1b")).is_none());
}

#[test]
fn local_index_replaces_remote_consumer_queries() {
    let (session, service) = counting_session(qc_side_use(), SessionConfig::default());
    let processes = [session.process(&id("P1")), session.process(&id("P2"))];
    let index = LocalProcessIndex::from_processes(&session, &processes).unwrap();

    let history = SampleHistory::builder(SAMPLE)
        .session(&session)
        .process_index(&index)
        .build()
        .unwrap()
        .reconstruct(&id("A3"), None)
        .unwrap();

    assert_eq!(service.counts().process_queries, 0);
    assert_eq!(history.chain(), [id("A2"), id("A1")]);
    // QC was not indexed, so it has no recorded step
    assert!(history.step(&id("A1"), &id("QC")).is_none());
}

#[test]
fn sorted_walk_with_local_index_makes_no_remote_calls() {
    let (session, service) = counting_session(qc_side_use(), SessionConfig::default());
    let processes = [
        session.process(&id("P1")),
        session.process(&id("P2")),
        session.process(&id("QC")),
    ];
    let index = LocalProcessIndex::from_processes(&session, &processes).unwrap();
    let reconstructor = SampleHistory::builder(SAMPLE)
        .session(&session)
        .process_index(&index)
        .build()
        .unwrap();
    let map = reconstructor.artifact_map().unwrap();

    let before = service.counts();
    let history = reconstructor.reconstruct_sorted(&map, &id("A3"), None).unwrap();
    let after = service.counts();

    assert_eq!(after, before);
    assert_eq!(after.remote_total(), before.remote_total());
    assert_eq!(history.chain(), [id("A2"), id("A1")]);
    assert_eq!(history.step(&id("A1"), &id("QC")).unwrap().output_artifact_id, None);
}

#[test]
fn repeated_reconstruction_reuses_cached_entities() {
    let (session, service) = counting_session(qc_side_use(), SessionConfig::default());
    let reconstructor = reconstructor(&session);

    let first = reconstructor.reconstruct(&id("A3"), None).unwrap();
    let fetches = service.counts().artifact_fetches + service.counts().process_fetches;
    let second = reconstructor.reconstruct(&id("A3"), None).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        service.counts().artifact_fetches + service.counts().process_fetches,
        fetches
    );
}

#[test]
fn process_without_io_map_is_fatal() {
    let mut broken = process("P1", "Prep");
    broken.input_output_maps = None;
    let lab = LabBuilder::new()
        .artifact(analyte("A1", SAMPLE, None))
        .artifact(analyte("A2", SAMPLE, Some("P1")))
        .process(broken)
        .build();
    let session = session_over(lab);

    let err = reconstructor(&session).reconstruct(&id("A2"), None).unwrap_err();
    assert!(err.is_malformed_process());
}

#[test]
fn missing_parent_process_surfaces_remote_error() {
    let lab = LabBuilder::new()
        .artifact(analyte("A2", SAMPLE, Some("P-gone")))
        .build();
    let session = session_over(lab);

    let err = reconstructor(&session).reconstruct(&id("A2"), None).unwrap_err();
    assert!(err.is_remote());
}

#[test]
fn cyclic_lineage_terminates() {
    let lab = LabBuilder::new()
        .artifact(analyte("A1", SAMPLE, Some("P2")))
        .artifact(analyte("A2", SAMPLE, Some("P1")))
        .process(process("P1", "Prep").with_io(id("A1"), Some((id("A2"), OutputType::Analyte))))
        .process(process("P2", "Prep").with_io(id("A2"), Some((id("A1"), OutputType::Analyte))))
        .build();
    let session = session_over(lab);
    let reconstructor = reconstructor(&session);

    let alternate = reconstructor.reconstruct(&id("A2"), None).unwrap();
    assert!(alternate.chain().len() <= 2);

    let map = reconstructor.artifact_map().unwrap();
    let sorted = reconstructor.reconstruct_sorted(&map, &id("A2"), None).unwrap();
    assert!(sorted.chain().len() <= map.len());
}

#[test]
fn builder_without_session_fails() {
    let err = SampleHistory::builder(SAMPLE).build().unwrap_err();
    assert!(matches!(err, HistoryError::MissingHistoryContext));
}

#[test]
fn small_cache_still_reconstructs() {
    let (session, _service) = counting_session(linear_chain(6), SessionConfig::new().with_cache_capacity(2));
    let history = reconstructor(&session).reconstruct(&id("A6"), None).unwrap();
    assert_eq!(history.chain().len(), 5);
    assert!(session.cache_stats().evictions > 0);
}

proptest! {
    #[test]
    fn linear_chain_walks_back_to_root(n in 1usize..16) {
        let session = session_over(linear_chain(n));
        let reconstructor = reconstructor(&session);
        let target = id(&format!("A{n}"));

        let history = reconstructor.reconstruct(&target, None).unwrap();
        let expected: Vec<_> = (1..n).rev().map(|i| id(&format!("A{i}"))).collect();
        prop_assert_eq!(history.chain(), expected.as_slice());
        prop_assert!(history.chain().windows(2).all(|w| w[0] != w[1]));

        let again = reconstructor.reconstruct(&target, None).unwrap();
        prop_assert_eq!(&history, &again);

        let map = reconstructor.artifact_map().unwrap();
        let sorted = reconstructor.reconstruct_sorted(&map, &target, None).unwrap();
        prop_assert_eq!(sorted.chain(), history.chain());
    }

    #[test]
    fn walk_from_any_member_terminates_within_bound(n in 1usize..12, start in 1usize..12) {
        let start = start.min(n);
        let session = session_over(linear_chain(n));
        let history = reconstructor(&session)
            .reconstruct(&id(&format!("A{start}")), None)
            .unwrap();
        prop_assert!(history.chain().len() < n.max(1));
        prop_assert_eq!(history.chain().len(), start - 1);
    }
}
