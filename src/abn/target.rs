//! Target abstraction networks.
//!
//! Groups the *targets* of one relationship type by the exact set of source
//! concepts pointing at them — the signature/area logic mirrored onto the
//! incoming side. Each group's source side can optionally be summarized by
//! is-a connectivity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, RelTypeId};
use crate::graph::{ConceptGraph, EdgeMode};

use super::partition::{Component, connected_components};

/// Targets sharing an identical incoming source-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    /// Stable group label: the smallest member target id.
    pub label: ConceptId,
    /// The exact source-set that is this group's identity.
    pub sources: BTreeSet<ConceptId>,
    /// Targets carrying that source-set.
    pub targets: BTreeSet<ConceptId>,
    /// Is-a summary of the source side; empty when not requested.
    pub source_components: Vec<Component>,
}

/// The target abstraction network for one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNetwork {
    /// Edge set the network was computed from.
    pub mode: EdgeMode,
    /// The relationship type being summarized.
    pub rel_type: RelTypeId,
    /// Groups sorted by label.
    pub groups: Vec<TargetGroup>,
}

impl TargetNetwork {
    /// The group containing a target concept, if it is one.
    pub fn group_of(&self, target: ConceptId) -> Option<&TargetGroup> {
        self.groups.iter().find(|g| g.targets.contains(&target))
    }
}

/// Build the target network for `rel_type` over the given edge set.
pub fn build(
    graph: &ConceptGraph,
    mode: EdgeMode,
    rel_type: RelTypeId,
    summarize_sources: bool,
) -> TargetNetwork {
    let mut incoming: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();
    for (source, target) in graph.pairs_for_type(mode, rel_type) {
        incoming.entry(target).or_default().insert(source);
    }

    let mut by_sources: BTreeMap<BTreeSet<ConceptId>, BTreeSet<ConceptId>> = BTreeMap::new();
    for (target, sources) in incoming {
        by_sources.entry(sources).or_default().insert(target);
    }

    let mut groups: Vec<TargetGroup> = by_sources
        .into_iter()
        .map(|(sources, targets)| {
            let label = *targets.first().expect("group without targets");
            let source_components = if summarize_sources {
                connected_components(graph, mode, &sources).components
            } else {
                Vec::new()
            };
            TargetGroup {
                label,
                sources,
                targets,
                source_components,
            }
        })
        .collect();
    groups.sort_by_key(|g| g.label);

    TargetNetwork {
        mode,
        rel_type,
        groups,
    }
}
