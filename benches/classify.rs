//! Benchmarks for classification over a synthetic concept hierarchy.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

use ontoscope::abn::signature::AreaIndex;
use ontoscope::concept::{ConceptId, ConceptMeta, RelTypeId};
use ontoscope::graph::{ConceptGraph, EdgeMode, RelEdge};
use ontoscope::live::{EditOperation, IncrementalUpdater, UpdaterConfig};

const CONCEPTS: u64 = 5_000;
const REL_TYPES: u64 = 12;

/// A layered random DAG: every concept gets 1-2 parents among earlier ids
/// and 0-3 relationship types.
fn synthetic_graph() -> ConceptGraph {
    let mut rng = StdRng::seed_from_u64(7);
    let g = ConceptGraph::new();
    for id in 1..=CONCEPTS {
        g.add_concept(ConceptMeta::new(
            ConceptId::new(id).unwrap(),
            format!("concept-{id}"),
        ))
        .unwrap();
    }
    for id in 2..=CONCEPTS {
        let child = ConceptId::new(id).unwrap();
        for _ in 0..rng.gen_range(1..=2) {
            let parent = ConceptId::new(rng.gen_range(1..id)).unwrap();
            let _ = g.add_is_a(EdgeMode::Asserted, child, parent);
        }
        for _ in 0..rng.gen_range(0..=3) {
            let rel_type = RelTypeId::new(rng.gen_range(1..=REL_TYPES) + CONCEPTS).unwrap();
            let target = ConceptId::new(rng.gen_range(1..=CONCEPTS)).unwrap();
            let _ = g.add_relationship(EdgeMode::Asserted, RelEdge::new(child, rel_type, target));
        }
    }
    g
}

fn bench_area_index(c: &mut Criterion) {
    let g = synthetic_graph();
    c.bench_function("area_index_5k", |bench| {
        bench.iter(|| black_box(AreaIndex::build(&g, EdgeMode::Asserted)))
    });
}

fn bench_full_session(c: &mut Criterion) {
    c.bench_function("full_session_5k", |bench| {
        bench.iter(|| {
            let g = synthetic_graph();
            black_box(IncrementalUpdater::new(g, UpdaterConfig::default()).unwrap())
        })
    });
}

fn bench_incremental_edit(c: &mut Criterion) {
    let mut updater =
        IncrementalUpdater::new(synthetic_graph(), UpdaterConfig::default()).unwrap();
    let rel_type = RelTypeId::new(CONCEPTS + 1).unwrap();
    let source = ConceptId::new(CONCEPTS / 2).unwrap();
    let target = ConceptId::new(1).unwrap();

    c.bench_function("toggle_relationship_5k", |bench| {
        bench.iter(|| {
            let _ = updater.apply(EditOperation::AddRelationship {
                source,
                rel_type,
                target,
            });
            let _ = updater.apply(EditOperation::RemoveRelationship {
                source,
                rel_type,
                target,
            });
        })
    });
}

criterion_group!(
    benches,
    bench_area_index,
    bench_full_session,
    bench_incremental_edit
);
criterion_main!(benches);
