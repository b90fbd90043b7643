//! Partial-area networks: per-area is-a components and disjoint units.
//!
//! A partial area is a maximal weakly-connected subhierarchy inside one
//! area. Beyond the partition itself this module derives the partial-area
//! child-of edges (a partial area specializes another when one of its root
//! concepts has an is-a parent in the other and the parent area's signature
//! is a strict subset), reduced to immediate parents.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::concept::ConceptId;
use crate::graph::{ConceptGraph, EdgeMode};

use super::partition::{ComponentPartition, DisjointUnit, GroupedPartition};
use super::signature::{AreaIndex, Signature};

/// Partial-area structure for every area of one edge set.
#[derive(Debug, Clone)]
pub struct PareaNetwork {
    mode: EdgeMode,
    grouped: GroupedPartition<Signature>,
    /// Partial-area label -> immediate parent partial-area labels.
    child_of: BTreeMap<ConceptId, BTreeSet<ConceptId>>,
}

impl PareaNetwork {
    /// Partition every area and derive child-of edges and disjoint units.
    pub fn build(graph: &ConceptGraph, mode: EdgeMode, areas: &AreaIndex) -> Self {
        let grouped = GroupedPartition::build(graph, mode, areas);
        let mut net = Self {
            mode,
            grouped,
            child_of: BTreeMap::new(),
        };
        net.rebuild_child_edges(graph, areas);
        tracing::debug!(
            mode = %mode,
            pareas = net.parea_count(),
            disjoint = net.disjoint_units().len(),
            "built partial-area network"
        );
        net
    }

    /// The edge set this network was computed from.
    pub fn mode(&self) -> EdgeMode {
        self.mode
    }

    /// The partial-area partition of one area.
    pub fn partition(&self, signature: &Signature) -> Option<&ComponentPartition> {
        self.grouped.partition(signature)
    }

    /// All (signature, partition) pairs, sorted by signature.
    pub fn partitions_sorted(&self) -> Vec<(&Signature, &ComponentPartition)> {
        self.grouped.partitions_sorted()
    }

    /// The partial-area label a concept belongs to.
    pub fn parea_of(&self, concept: ConceptId) -> Option<ConceptId> {
        self.grouped.component_of(concept)
    }

    /// The exact set of partial-area labels reachable through ancestor
    /// is-a edges (own partial area included).
    pub fn ancestor_pareas(&self, concept: ConceptId) -> Option<&BTreeSet<ConceptId>> {
        self.grouped.ancestor_set(concept)
    }

    /// Disjoint partial-areas: concepts grouped by exact ancestor sets.
    pub fn disjoint_units(&self) -> &[DisjointUnit] {
        self.grouped.disjoint_units()
    }

    /// Immediate parent partial-areas of a partial area, if it has any.
    pub fn parent_pareas(&self, label: ConceptId) -> Option<&BTreeSet<ConceptId>> {
        self.child_of.get(&label)
    }

    /// All child -> parents edges, sorted by child label.
    pub fn child_edges(&self) -> &BTreeMap<ConceptId, BTreeSet<ConceptId>> {
        &self.child_of
    }

    /// Total number of partial areas across all areas.
    pub fn parea_count(&self) -> usize {
        self.partitions_sorted()
            .iter()
            .map(|(_, p)| p.components.len())
            .sum()
    }

    pub(crate) fn grouped_mut(&mut self) -> &mut GroupedPartition<Signature> {
        &mut self.grouped
    }

    /// Recompute child-of edges from the current partitions.
    ///
    /// Derived wholesale: the edge set is small (one entry per partial area)
    /// and cheap next to the component and ancestor caches, which stay
    /// incremental.
    pub(crate) fn rebuild_child_edges(&mut self, graph: &ConceptGraph, areas: &AreaIndex) {
        let mut child_of: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();

        for (signature, partition) in self.grouped.partitions_sorted() {
            for component in &partition.components {
                // Candidate parents: partial areas holding an is-a parent of
                // one of our roots, with a strictly smaller signature.
                let mut candidates: HashMap<ConceptId, Signature> = HashMap::new();
                for &root in &component.roots {
                    for parent in graph.parents(self.mode, root) {
                        let Some(parent_label) = self.grouped.component_of(parent) else {
                            continue;
                        };
                        let Some(parent_sig) = areas.area_of(parent) else {
                            continue;
                        };
                        if parent_sig.is_strict_subset_of(signature) {
                            candidates.insert(parent_label, parent_sig.clone());
                        }
                    }
                }
                // Keep only immediate parents: drop a candidate whose
                // signature is a strict subset of another candidate's.
                let immediate: BTreeSet<ConceptId> = candidates
                    .iter()
                    .filter(|(label, sig)| {
                        !candidates.iter().any(|(other, other_sig)| {
                            *other != **label && sig.is_strict_subset_of(other_sig)
                        })
                    })
                    .map(|(&label, _)| label)
                    .collect();
                if !immediate.is_empty() {
                    child_of.insert(component.label, immediate);
                }
            }
        }
        self.child_of = child_of;
    }

    /// Incremental maintenance: re-partition dirty areas, refresh ancestor
    /// caches along the invalidation cone, and rebuild the derived layers.
    ///
    /// `invalidated` must already contain the descendant cones of every
    /// structurally affected concept; concepts whose partial-area label
    /// changed extend the cone with their own descendants before the
    /// ancestor refresh.
    pub(crate) fn refresh(
        &mut self,
        graph: &ConceptGraph,
        areas: &AreaIndex,
        dirty_areas: &HashSet<Signature>,
        invalidated: &mut HashSet<ConceptId>,
    ) {
        let changed = self
            .grouped
            .rebuild_groups(graph, self.mode, areas, dirty_areas);
        for &c in &changed {
            if graph.contains_concept(c) {
                invalidated.insert(c);
                invalidated.extend(crate::graph::hierarchy::descendants(graph, self.mode, c));
            }
        }
        self.grouped.refresh_ancestors(graph, self.mode, invalidated);
        self.grouped.rebuild_disjoint();
        self.rebuild_child_edges(graph, areas);
    }
}
