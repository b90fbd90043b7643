//! Live-session tests: incremental maintenance, atomicity, and diffing.
//!
//! The central property throughout: after any valid edit sequence, the
//! incrementally maintained networks are identical to a full rebuild from
//! the resulting graph.

use std::collections::BTreeSet;

use ontoscope::concept::{ConceptId, ConceptMeta, RelTypeId};
use ontoscope::error::UpdateError;
use ontoscope::graph::{ConceptGraph, EdgeMode, RelEdge};
use ontoscope::live::{
    ChangeState, DiffMode, EditOperation, IncrementalUpdater, UpdaterConfig,
};

fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn cid(id: u64) -> ConceptId {
    ConceptId::new(id).unwrap()
}

fn rid(id: u64) -> RelTypeId {
    RelTypeId::new(id).unwrap()
}

fn set(ids: &[u64]) -> BTreeSet<ConceptId> {
    ids.iter().map(|&i| cid(i)).collect()
}

const SITE: u64 = 101;
const AGENT: u64 = 102;

/// Same clinical-style fixture as the network tests.
fn fixture() -> ConceptGraph {
    let g = ConceptGraph::new();
    for (id, label) in [
        (1, "finding"),
        (2, "disease"),
        (3, "infection"),
        (4, "pneumonia"),
        (5, "viral pneumonia"),
        (6, "bacterial pneumonia"),
        (7, "fracture"),
        (8, "injury"),
        (9, "burn"),
        (12, "post-traumatic pneumonia"),
        (20, "lung"),
        (21, "lobe"),
        (22, "limb"),
        (23, "bone"),
        (24, "chest"),
        (30, "virus"),
        (31, "bacterium"),
    ] {
        g.add_concept(ConceptMeta::new(cid(id), label)).unwrap();
    }
    for (c, p) in [
        (2, 1),
        (8, 1),
        (3, 2),
        (7, 2),
        (4, 3),
        (5, 4),
        (6, 4),
        (9, 8),
        (9, 2),
        (12, 4),
        (12, 7),
    ] {
        g.add_is_a(EdgeMode::Asserted, cid(c), cid(p)).unwrap();
    }
    for (s, r, t) in [
        (3, SITE, 20),
        (4, SITE, 21),
        (5, SITE, 21),
        (5, AGENT, 30),
        (6, SITE, 21),
        (6, AGENT, 31),
        (7, SITE, 22),
        (7, SITE, 23),
        (9, SITE, 22),
        (9, SITE, 23),
        (12, SITE, 24),
        (12, AGENT, 30),
    ] {
        g.add_relationship(EdgeMode::Asserted, RelEdge::new(cid(s), rid(r), cid(t)))
            .unwrap();
    }
    g
}

fn full_config() -> UpdaterConfig {
    UpdaterConfig {
        tribe_roots: Some(set(&[2, 8])),
        target_types: vec![rid(SITE), rid(AGENT)],
        summarize_target_sources: true,
        ..Default::default()
    }
}

/// Copy a graph's asserted content into a fresh instance.
fn clone_graph(g: &ConceptGraph) -> ConceptGraph {
    let fresh = ConceptGraph::new();
    for id in g.concept_ids() {
        fresh.add_concept(g.meta(id).unwrap()).unwrap();
    }
    for (child, parent) in g.is_a_edges(EdgeMode::Asserted) {
        fresh.add_is_a(EdgeMode::Asserted, child, parent).unwrap();
    }
    for edge in g.relationship_edges(EdgeMode::Asserted) {
        fresh.add_relationship(EdgeMode::Asserted, edge).unwrap();
    }
    fresh
}

/// Assert the incrementally maintained state equals a from-scratch rebuild.
fn assert_converged(updater: &IncrementalUpdater) {
    let rebuilt =
        IncrementalUpdater::new(clone_graph(updater.graph()), updater.config().clone()).unwrap();
    assert_eq!(updater.snapshot(), rebuilt.snapshot());
}

#[test]
fn incremental_equals_full_rebuild_over_a_long_edit_sequence() {
    trace_init();
    let mut updater = IncrementalUpdater::new(fixture(), full_config()).unwrap();

    let edits = [
        EditOperation::AddConcept {
            concept: cid(40),
            label: "fungal pneumonia".into(),
        },
        EditOperation::AddIsA {
            child: cid(40),
            parent: cid(5),
        },
        EditOperation::AddRelationship {
            source: cid(40),
            rel_type: rid(SITE),
            target: cid(20),
        },
        EditOperation::RemoveIsA {
            child: cid(12),
            parent: cid(7),
        },
        EditOperation::AddIsA {
            child: cid(12),
            parent: cid(9),
        },
        EditOperation::RemoveRelationship {
            source: cid(5),
            rel_type: rid(AGENT),
            target: cid(30),
        },
        EditOperation::RemoveConcept { concept: cid(7) },
        EditOperation::RemoveConcept { concept: cid(21) },
    ];

    for op in edits {
        updater.apply(op).unwrap();
        assert_converged(&updater);
    }
}

#[test]
fn second_parent_in_another_partial_area_updates_disjoint_key() {
    // A is-a B is-a C; B, C carry R1; D carries R2 in its own area.
    let g = ConceptGraph::new();
    for (id, label) in [(1, "A"), (2, "B"), (3, "C"), (4, "D"), (9, "t")] {
        g.add_concept(ConceptMeta::new(cid(id), label)).unwrap();
    }
    g.add_is_a(EdgeMode::Asserted, cid(1), cid(2)).unwrap();
    g.add_is_a(EdgeMode::Asserted, cid(2), cid(3)).unwrap();
    for s in [2, 3] {
        g.add_relationship(EdgeMode::Asserted, RelEdge::new(cid(s), rid(7), cid(9)))
            .unwrap();
    }
    g.add_relationship(EdgeMode::Asserted, RelEdge::new(cid(4), rid(8), cid(9)))
        .unwrap();

    let mut updater = IncrementalUpdater::new(g, UpdaterConfig::default()).unwrap();
    // Before the edit A's ancestry spans one partial area besides its own.
    assert_eq!(
        updater.pareas().ancestor_pareas(cid(1)).unwrap(),
        &set(&[1, 2])
    );

    updater
        .apply(EditOperation::AddIsA {
            child: cid(1),
            parent: cid(4),
        })
        .unwrap();

    // A now descends from the {B, C} partial area and from D's.
    assert_eq!(
        updater.pareas().ancestor_pareas(cid(1)).unwrap(),
        &set(&[1, 2, 4])
    );
    let unit = updater
        .pareas()
        .disjoint_units()
        .iter()
        .find(|u| u.concepts.contains(&cid(1)))
        .unwrap();
    assert_eq!(unit.key, set(&[1, 2, 4]));
    assert_converged(&updater);
}

#[test]
fn failed_edit_leaves_graph_and_networks_unchanged() {
    let mut updater = IncrementalUpdater::new(fixture(), full_config()).unwrap();
    let snapshot_before = updater.snapshot();
    let is_a_before = updater.graph().is_a_edges(EdgeMode::Asserted);
    let rels_before = updater.graph().relationship_edges(EdgeMode::Asserted);

    let rejected = [
        EditOperation::AddIsA {
            child: cid(1),
            parent: cid(999),
        },
        EditOperation::RemoveConcept { concept: cid(999) },
        EditOperation::AddRelationship {
            source: cid(999),
            rel_type: rid(SITE),
            target: cid(20),
        },
        EditOperation::RemoveRelationship {
            source: cid(3),
            rel_type: rid(AGENT),
            target: cid(20),
        },
        EditOperation::AddConcept {
            concept: cid(1),
            label: "dup".into(),
        },
        EditOperation::AddIsA {
            child: cid(2),
            parent: cid(1),
        },
    ];
    for op in rejected {
        let err = updater.apply(op).unwrap_err();
        assert!(matches!(err, UpdateError::Apply { .. }));
    }

    assert_eq!(updater.snapshot(), snapshot_before);
    assert_eq!(updater.graph().is_a_edges(EdgeMode::Asserted), is_a_before);
    assert_eq!(
        updater.graph().relationship_edges(EdgeMode::Asserted),
        rels_before
    );
}

#[test]
fn signature_preserving_edit_leaves_areas_unchanged() {
    // 7 carries site twice; dropping one edge keeps its signature.
    let mut updater = IncrementalUpdater::new(
        fixture(),
        UpdaterConfig {
            diff: Some(DiffMode::Cumulative),
            target_types: vec![rid(SITE)],
            ..Default::default()
        },
    )
    .unwrap();

    updater
        .apply(EditOperation::RemoveRelationship {
            source: cid(7),
            rel_type: rid(SITE),
            target: cid(23),
        })
        .unwrap();

    let diff = updater.diff().unwrap();
    assert!(diff.areas.iter().all(|c| c.state == ChangeState::Unchanged));
    assert!(diff.pareas.iter().all(|c| c.state == ChangeState::Unchanged));
    // Only the target layer moved: {22, 23} splits.
    assert!(
        diff.target_groups
            .iter()
            .any(|c| c.state != ChangeState::Unchanged)
    );
    assert_converged(&updater);
}

#[test]
fn cumulative_diff_marks_touched_areas_only() {
    let mut updater = IncrementalUpdater::new(
        fixture(),
        UpdaterConfig {
            diff: Some(DiffMode::Cumulative),
            tribe_roots: Some(set(&[2, 8])),
            ..Default::default()
        },
    )
    .unwrap();

    // 6 loses its agent edge and falls back to the site-only area.
    updater
        .apply(EditOperation::RemoveRelationship {
            source: cid(6),
            rel_type: rid(AGENT),
            target: cid(31),
        })
        .unwrap();

    let diff = updater.diff().unwrap();
    let area_state = |key: &[u64]| {
        let key: Vec<RelTypeId> = key.iter().map(|&t| rid(t)).collect();
        diff.areas
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.state)
            .unwrap()
    };
    assert_eq!(area_state(&[SITE]), ChangeState::Modified);
    assert_eq!(area_state(&[SITE, AGENT]), ChangeState::Modified);
    assert_eq!(area_state(&[]), ChangeState::Unchanged);
    // Bands never depend on signatures.
    assert!(diff.bands.iter().all(|c| c.state == ChangeState::Unchanged));

    assert_eq!(updater.applied_ops().len(), 1);
    assert_converged(&updater);
}

#[test]
fn progressive_diff_keeps_a_per_edit_changelog() {
    let mut updater = IncrementalUpdater::new(
        fixture(),
        UpdaterConfig {
            diff: Some(DiffMode::Progressive),
            ..Default::default()
        },
    )
    .unwrap();

    updater
        .apply(EditOperation::AddConcept {
            concept: cid(50),
            label: "sepsis".into(),
        })
        .unwrap();
    updater
        .apply(EditOperation::AddRelationship {
            source: cid(50),
            rel_type: rid(AGENT),
            target: cid(31),
        })
        .unwrap();

    let log = updater.changelog();
    assert_eq!(log.len(), 2);

    // First record: the ∅ area gained a member.
    let first_empty_area = log[0]
        .diff
        .areas
        .iter()
        .find(|c| c.key.is_empty())
        .unwrap();
    assert_eq!(first_empty_area.state, ChangeState::Modified);

    // Second record is relative to the state after the first edit: the ∅
    // area loses 50 again (Modified) and the {agent} area appears.
    let agent_area = log[1]
        .diff
        .areas
        .iter()
        .find(|c| c.key == vec![rid(AGENT)])
        .unwrap();
    assert_eq!(agent_area.state, ChangeState::Added);

    // Between edits the advanced baseline matches the current state.
    assert!(updater.diff().unwrap().is_unchanged());
}

#[test]
fn rebaseline_restarts_the_session() {
    let mut updater = IncrementalUpdater::new(
        fixture(),
        UpdaterConfig {
            diff: Some(DiffMode::Cumulative),
            ..Default::default()
        },
    )
    .unwrap();

    updater
        .apply(EditOperation::RemoveRelationship {
            source: cid(6),
            rel_type: rid(AGENT),
            target: cid(31),
        })
        .unwrap();
    assert!(!updater.diff().unwrap().is_unchanged());

    updater.rebaseline();
    assert!(updater.diff().unwrap().is_unchanged());
    assert!(updater.applied_ops().is_empty());
}

#[test]
fn band_membership_follows_hierarchy_edits() {
    let mut updater = IncrementalUpdater::new(fixture(), full_config()).unwrap();
    assert_eq!(
        updater.tribal().unwrap().band_of(cid(9)),
        Some(&set(&[2, 8]))
    );

    // Burn stops being a disease: it drops to the injury-only band.
    updater
        .apply(EditOperation::RemoveIsA {
            child: cid(9),
            parent: cid(2),
        })
        .unwrap();
    assert_eq!(updater.tribal().unwrap().band_of(cid(9)), Some(&set(&[8])));
    assert_converged(&updater);

    // And back.
    updater
        .apply(EditOperation::AddIsA {
            child: cid(9),
            parent: cid(2),
        })
        .unwrap();
    assert_eq!(
        updater.tribal().unwrap().band_of(cid(9)),
        Some(&set(&[2, 8]))
    );
    assert_converged(&updater);
}

#[test]
fn removing_a_relationship_target_reclassifies_its_sources() {
    let mut updater = IncrementalUpdater::new(fixture(), full_config()).unwrap();

    // 30 is the agent target of 5 and 12; removing it shrinks their
    // signatures through cascade deletion.
    updater
        .apply(EditOperation::RemoveConcept { concept: cid(30) })
        .unwrap();

    use ontoscope::abn::signature::Signature;
    assert_eq!(
        updater.areas().area_of(cid(5)),
        Some(&Signature::from_types([rid(SITE)]))
    );
    assert_eq!(
        updater.areas().area_of(cid(12)),
        Some(&Signature::from_types([rid(SITE)]))
    );
    assert_converged(&updater);
}

#[test]
fn edits_are_observed_in_submission_order() {
    let mut updater = IncrementalUpdater::new(fixture(), UpdaterConfig::default()).unwrap();

    // Second edit depends on the first having fully applied.
    updater
        .apply(EditOperation::AddConcept {
            concept: cid(60),
            label: "lesion".into(),
        })
        .unwrap();
    updater
        .apply(EditOperation::AddIsA {
            child: cid(60),
            parent: cid(1),
        })
        .unwrap();
    updater
        .apply(EditOperation::AddRelationship {
            source: cid(60),
            rel_type: rid(SITE),
            target: cid(20),
        })
        .unwrap();

    use ontoscope::abn::signature::Signature;
    assert_eq!(
        updater.areas().area_of(cid(60)),
        Some(&Signature::from_types([rid(SITE)]))
    );
    assert_converged(&updater);
}
