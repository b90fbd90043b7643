//! In-memory concept graph with dual-indexing.
//!
//! Uses `petgraph` for the graph structure and `DashMap` for fast lookups
//! by concept id and relationship type. One [`EdgeStore`] per [`EdgeMode`];
//! concepts exist in both stores, edges never cross stores.

use std::collections::BTreeSet;
use std::sync::RwLock;

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::concept::{ConceptId, ConceptMeta, RelTypeId};
use crate::error::GraphError;

use super::{EdgeKind, EdgeMode, RelEdge};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// One edge set: a stable directed graph plus secondary indexes.
///
/// `StableDiGraph` keeps node indices valid across removals, so the
/// id -> index table survives concept deletion untouched.
struct EdgeStore {
    graph: RwLock<StableDiGraph<ConceptId, EdgeKind>>,
    /// ConceptId -> NodeIndex mapping for O(1) node lookups.
    node_index: DashMap<ConceptId, NodeIndex>,
    /// Relationship-type index: type -> set of (source, target) pairs.
    rel_index: DashMap<RelTypeId, BTreeSet<(ConceptId, ConceptId)>>,
}

impl EdgeStore {
    fn new() -> Self {
        Self {
            graph: RwLock::new(StableDiGraph::new()),
            node_index: DashMap::new(),
            rel_index: DashMap::new(),
        }
    }

    fn index_of(&self, concept: ConceptId) -> Option<NodeIndex> {
        self.node_index.get(&concept).map(|idx| *idx.value())
    }

    fn add_node(&self, concept: ConceptId) {
        let mut graph = self.graph.write().expect("graph lock poisoned");
        let idx = graph.add_node(concept);
        self.node_index.insert(concept, idx);
    }

    /// Remove a node and all incident edges in one step.
    fn remove_node(&self, concept: ConceptId) {
        let Some(idx) = self.index_of(concept) else {
            return;
        };
        let mut graph = self.graph.write().expect("graph lock poisoned");

        // Clean the relationship index before the node (and its incident
        // edges) disappear from the graph.
        let incident: Vec<(ConceptId, RelTypeId, ConceptId)> = graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(graph.edges_directed(idx, Direction::Incoming))
            .filter_map(|e| match *e.weight() {
                EdgeKind::Relationship(rt) => {
                    let src = *graph.node_weight(e.source())?;
                    let tgt = *graph.node_weight(e.target())?;
                    Some((src, rt, tgt))
                }
                EdgeKind::IsA => None,
            })
            .collect();
        for (src, rt, tgt) in incident {
            if let Some(mut pairs) = self.rel_index.get_mut(&rt) {
                pairs.remove(&(src, tgt));
            }
        }
        self.rel_index.retain(|_, pairs| !pairs.is_empty());

        graph.remove_node(idx);
        self.node_index.remove(&concept);
    }

    fn has_edge(&self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        let graph = self.graph.read().expect("graph lock poisoned");
        graph.edges_connecting(from, to).any(|e| *e.weight() == kind)
    }

    fn add_edge(&self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) {
        let mut graph = self.graph.write().expect("graph lock poisoned");
        graph.add_edge(from, to, kind);
    }

    fn remove_edge(&self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        let mut graph = self.graph.write().expect("graph lock poisoned");
        let edge = graph
            .edges_connecting(from, to)
            .find(|e| *e.weight() == kind)
            .map(|e| e.id());
        match edge {
            Some(id) => {
                graph.remove_edge(id);
                true
            }
            None => false,
        }
    }

    fn neighbors_by_kind(
        &self,
        concept: ConceptId,
        direction: Direction,
        want_is_a: bool,
    ) -> Vec<ConceptId> {
        let Some(idx) = self.index_of(concept) else {
            return vec![];
        };
        let graph = self.graph.read().expect("graph lock poisoned");
        let mut out: Vec<ConceptId> = graph
            .edges_directed(idx, direction)
            .filter(|e| matches!(e.weight(), EdgeKind::IsA) == want_is_a)
            .filter_map(|e| {
                let other = if direction == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                graph.node_weight(other).copied()
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn rel_targets(&self, concept: ConceptId) -> Vec<(RelTypeId, ConceptId)> {
        let Some(idx) = self.index_of(concept) else {
            return vec![];
        };
        let graph = self.graph.read().expect("graph lock poisoned");
        let mut out: Vec<(RelTypeId, ConceptId)> = graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match *e.weight() {
                EdgeKind::Relationship(rt) => Some((rt, *graph.node_weight(e.target())?)),
                EdgeKind::IsA => None,
            })
            .collect();
        out.sort_unstable();
        out
    }

    fn rel_sources(&self, concept: ConceptId) -> Vec<(ConceptId, RelTypeId)> {
        let Some(idx) = self.index_of(concept) else {
            return vec![];
        };
        let graph = self.graph.read().expect("graph lock poisoned");
        let mut out: Vec<(ConceptId, RelTypeId)> = graph
            .edges_directed(idx, Direction::Incoming)
            .filter_map(|e| match *e.weight() {
                EdgeKind::Relationship(rt) => Some((*graph.node_weight(e.source())?, rt)),
                EdgeKind::IsA => None,
            })
            .collect();
        out.sort_unstable();
        out
    }

    fn rel_types_of(&self, concept: ConceptId) -> BTreeSet<RelTypeId> {
        let Some(idx) = self.index_of(concept) else {
            return BTreeSet::new();
        };
        let graph = self.graph.read().expect("graph lock poisoned");
        graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match *e.weight() {
                EdgeKind::Relationship(rt) => Some(rt),
                EdgeKind::IsA => None,
            })
            .collect()
    }

    fn is_a_edges(&self) -> Vec<(ConceptId, ConceptId)> {
        let graph = self.graph.read().expect("graph lock poisoned");
        let mut out: Vec<(ConceptId, ConceptId)> = graph
            .edge_indices()
            .filter_map(|ei| {
                if !matches!(graph.edge_weight(ei), Some(EdgeKind::IsA)) {
                    return None;
                }
                let (src, dst) = graph.edge_endpoints(ei)?;
                Some((*graph.node_weight(src)?, *graph.node_weight(dst)?))
            })
            .collect();
        out.sort_unstable();
        out
    }

    fn rel_edges(&self) -> Vec<RelEdge> {
        let mut out: Vec<RelEdge> = self
            .rel_index
            .iter()
            .flat_map(|entry| {
                let rt = *entry.key();
                entry
                    .value()
                    .iter()
                    .map(move |&(src, tgt)| RelEdge::new(src, rt, tgt))
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_unstable_by_key(|e| (e.source, e.rel_type, e.target));
        out
    }
}

/// In-memory concept graph with asserted and inferred edge sets.
///
/// Mutations validate referential integrity and fail without side effects;
/// removing a concept cascades all incident edges in both edge sets as a
/// single logical step. One logical writer at a time per graph instance;
/// read-only queries may run concurrently with each other.
pub struct ConceptGraph {
    concepts: DashMap<ConceptId, ConceptMeta>,
    rel_labels: DashMap<RelTypeId, String>,
    asserted: EdgeStore,
    inferred: EdgeStore,
}

impl ConceptGraph {
    /// Create a new empty concept graph.
    pub fn new() -> Self {
        Self {
            concepts: DashMap::new(),
            rel_labels: DashMap::new(),
            asserted: EdgeStore::new(),
            inferred: EdgeStore::new(),
        }
    }

    fn store(&self, mode: EdgeMode) -> &EdgeStore {
        match mode {
            EdgeMode::Asserted => &self.asserted,
            EdgeMode::Inferred => &self.inferred,
        }
    }

    // -- concepts -----------------------------------------------------------

    /// Add a concept. Fails if the id is already present.
    pub fn add_concept(&self, meta: ConceptMeta) -> GraphResult<()> {
        if self.concepts.contains_key(&meta.id) {
            return Err(GraphError::DuplicateConcept {
                concept: meta.id.get(),
            });
        }
        self.asserted.add_node(meta.id);
        self.inferred.add_node(meta.id);
        self.concepts.insert(meta.id, meta);
        Ok(())
    }

    /// Remove a concept, cascading all incident edges in both edge sets.
    pub fn remove_concept(&self, concept: ConceptId) -> GraphResult<()> {
        if !self.concepts.contains_key(&concept) {
            return Err(GraphError::UnknownConcept {
                concept: concept.get(),
            });
        }
        self.asserted.remove_node(concept);
        self.inferred.remove_node(concept);
        self.concepts.remove(&concept);
        Ok(())
    }

    /// Check if a concept exists.
    pub fn contains_concept(&self, concept: ConceptId) -> bool {
        self.concepts.contains_key(&concept)
    }

    /// Number of concepts.
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// All concept ids, sorted.
    pub fn concept_ids(&self) -> Vec<ConceptId> {
        let mut ids: Vec<ConceptId> = self.concepts.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Metadata for a concept, if present.
    pub fn meta(&self, concept: ConceptId) -> Option<ConceptMeta> {
        self.concepts.get(&concept).map(|e| e.value().clone())
    }

    /// Resolve a concept label, falling back to the id form.
    pub fn label(&self, concept: ConceptId) -> String {
        self.concepts
            .get(&concept)
            .map(|e| e.value().label.clone())
            .unwrap_or_else(|| concept.to_string())
    }

    // -- relationship types -------------------------------------------------

    /// Register a display label for a relationship type.
    pub fn register_rel_type(&self, rel_type: RelTypeId, label: impl Into<String>) {
        self.rel_labels.insert(rel_type, label.into());
    }

    /// Resolve a relationship-type label, falling back to the id form.
    pub fn rel_label(&self, rel_type: RelTypeId) -> String {
        self.rel_labels
            .get(&rel_type)
            .map(|e| e.value().clone())
            .unwrap_or_else(|| rel_type.to_string())
    }

    // -- edge mutations -----------------------------------------------------

    fn require(&self, store: &EdgeStore, concept: ConceptId) -> GraphResult<NodeIndex> {
        store.index_of(concept).ok_or(GraphError::UnknownConcept {
            concept: concept.get(),
        })
    }

    /// Add an is-a edge (child -> parent) to the given edge set.
    pub fn add_is_a(&self, mode: EdgeMode, child: ConceptId, parent: ConceptId) -> GraphResult<()> {
        let store = self.store(mode);
        let child_idx = self.require(store, child)?;
        let parent_idx = self.require(store, parent)?;
        if store.has_edge(child_idx, parent_idx, EdgeKind::IsA) {
            return Err(GraphError::DuplicateIsA {
                child: child.get(),
                parent: parent.get(),
            });
        }
        store.add_edge(child_idx, parent_idx, EdgeKind::IsA);
        Ok(())
    }

    /// Remove an is-a edge from the given edge set.
    pub fn remove_is_a(
        &self,
        mode: EdgeMode,
        child: ConceptId,
        parent: ConceptId,
    ) -> GraphResult<()> {
        let store = self.store(mode);
        let child_idx = self.require(store, child)?;
        let parent_idx = self.require(store, parent)?;
        if !store.remove_edge(child_idx, parent_idx, EdgeKind::IsA) {
            return Err(GraphError::MissingIsA {
                child: child.get(),
                parent: parent.get(),
            });
        }
        Ok(())
    }

    /// Add a defining-relationship edge to the given edge set.
    pub fn add_relationship(&self, mode: EdgeMode, edge: RelEdge) -> GraphResult<()> {
        let store = self.store(mode);
        let src_idx = self.require(store, edge.source)?;
        let tgt_idx = self.require(store, edge.target)?;
        let kind = EdgeKind::Relationship(edge.rel_type);
        if store.has_edge(src_idx, tgt_idx, kind) {
            return Err(GraphError::DuplicateRelationship {
                src: edge.source.get(),
                rel_type: edge.rel_type.get(),
                target: edge.target.get(),
            });
        }
        store.add_edge(src_idx, tgt_idx, kind);
        store
            .rel_index
            .entry(edge.rel_type)
            .or_default()
            .insert((edge.source, edge.target));
        Ok(())
    }

    /// Remove a defining-relationship edge from the given edge set.
    pub fn remove_relationship(&self, mode: EdgeMode, edge: RelEdge) -> GraphResult<()> {
        let store = self.store(mode);
        let src_idx = self.require(store, edge.source)?;
        let tgt_idx = self.require(store, edge.target)?;
        let kind = EdgeKind::Relationship(edge.rel_type);
        if !store.remove_edge(src_idx, tgt_idx, kind) {
            return Err(GraphError::MissingRelationship {
                src: edge.source.get(),
                rel_type: edge.rel_type.get(),
                target: edge.target.get(),
            });
        }
        if let Some(mut pairs) = store.rel_index.get_mut(&edge.rel_type) {
            pairs.remove(&(edge.source, edge.target));
        }
        store.rel_index.retain(|_, pairs| !pairs.is_empty());
        Ok(())
    }

    /// Replace the entire inferred edge set, as supplied by a reasoner.
    ///
    /// The previous inferred edges are discarded; asserted edges are
    /// untouched. Every referenced concept must already exist.
    pub fn set_inferred(
        &self,
        is_a: impl IntoIterator<Item = (ConceptId, ConceptId)>,
        relationships: impl IntoIterator<Item = RelEdge>,
    ) -> GraphResult<()> {
        let is_a: Vec<(ConceptId, ConceptId)> = is_a.into_iter().collect();
        let relationships: Vec<RelEdge> = relationships.into_iter().collect();
        for &(child, parent) in &is_a {
            for c in [child, parent] {
                if !self.contains_concept(c) {
                    return Err(GraphError::UnknownConcept { concept: c.get() });
                }
            }
        }
        for edge in &relationships {
            for c in [edge.source, edge.target] {
                if !self.contains_concept(c) {
                    return Err(GraphError::UnknownConcept { concept: c.get() });
                }
            }
        }

        let store = &self.inferred;
        {
            let mut graph = store.graph.write().expect("graph lock poisoned");
            graph.clear();
            store.node_index.clear();
            store.rel_index.clear();
            for entry in self.concepts.iter() {
                let idx = graph.add_node(*entry.key());
                store.node_index.insert(*entry.key(), idx);
            }
        }
        for (child, parent) in is_a {
            let child_idx = self.require(store, child)?;
            let parent_idx = self.require(store, parent)?;
            if !store.has_edge(child_idx, parent_idx, EdgeKind::IsA) {
                store.add_edge(child_idx, parent_idx, EdgeKind::IsA);
            }
        }
        for edge in relationships {
            let src_idx = self.require(store, edge.source)?;
            let tgt_idx = self.require(store, edge.target)?;
            let kind = EdgeKind::Relationship(edge.rel_type);
            if !store.has_edge(src_idx, tgt_idx, kind) {
                store.add_edge(src_idx, tgt_idx, kind);
                store
                    .rel_index
                    .entry(edge.rel_type)
                    .or_default()
                    .insert((edge.source, edge.target));
            }
        }
        Ok(())
    }

    // -- queries ------------------------------------------------------------

    /// Direct is-a parents of a concept, sorted.
    pub fn parents(&self, mode: EdgeMode, concept: ConceptId) -> Vec<ConceptId> {
        self.store(mode)
            .neighbors_by_kind(concept, Direction::Outgoing, true)
    }

    /// Direct is-a children of a concept, sorted.
    pub fn children(&self, mode: EdgeMode, concept: ConceptId) -> Vec<ConceptId> {
        self.store(mode)
            .neighbors_by_kind(concept, Direction::Incoming, true)
    }

    /// Outgoing defining relationships of a concept, sorted by (type, target).
    pub fn relationship_targets(
        &self,
        mode: EdgeMode,
        concept: ConceptId,
    ) -> Vec<(RelTypeId, ConceptId)> {
        self.store(mode).rel_targets(concept)
    }

    /// Incoming defining relationships of a concept, sorted by (source, type).
    pub fn relationship_sources(
        &self,
        mode: EdgeMode,
        concept: ConceptId,
    ) -> Vec<(ConceptId, RelTypeId)> {
        self.store(mode).rel_sources(concept)
    }

    /// The set of relationship types a concept directly instantiates.
    pub fn relationship_types_of(&self, mode: EdgeMode, concept: ConceptId) -> BTreeSet<RelTypeId> {
        self.store(mode).rel_types_of(concept)
    }

    /// Targets of a concept's outgoing relationships of one type, sorted.
    pub fn targets_of(
        &self,
        mode: EdgeMode,
        concept: ConceptId,
        rel_type: RelTypeId,
    ) -> Vec<ConceptId> {
        self.store(mode)
            .rel_targets(concept)
            .into_iter()
            .filter(|&(rt, _)| rt == rel_type)
            .map(|(_, target)| target)
            .collect()
    }

    /// Sources of a concept's incoming relationships of one type, sorted.
    pub fn sources_of(
        &self,
        mode: EdgeMode,
        concept: ConceptId,
        rel_type: RelTypeId,
    ) -> Vec<ConceptId> {
        self.store(mode)
            .rel_sources(concept)
            .into_iter()
            .filter(|&(_, rt)| rt == rel_type)
            .map(|(source, _)| source)
            .collect()
    }

    /// All (source, target) pairs for a relationship type, sorted.
    pub fn pairs_for_type(&self, mode: EdgeMode, rel_type: RelTypeId) -> Vec<(ConceptId, ConceptId)> {
        self.store(mode)
            .rel_index
            .get(&rel_type)
            .map(|pairs| pairs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All relationship types with at least one edge, sorted.
    pub fn rel_types(&self, mode: EdgeMode) -> Vec<RelTypeId> {
        let mut types: Vec<RelTypeId> = self
            .store(mode)
            .rel_index
            .iter()
            .map(|e| *e.key())
            .collect();
        types.sort_unstable();
        types
    }

    /// Whether the given is-a edge exists.
    pub fn has_is_a(&self, mode: EdgeMode, child: ConceptId, parent: ConceptId) -> bool {
        let store = self.store(mode);
        match (store.index_of(child), store.index_of(parent)) {
            (Some(c), Some(p)) => store.has_edge(c, p, EdgeKind::IsA),
            _ => false,
        }
    }

    /// All is-a edges (child, parent) in the given edge set, sorted.
    pub fn is_a_edges(&self, mode: EdgeMode) -> Vec<(ConceptId, ConceptId)> {
        self.store(mode).is_a_edges()
    }

    /// All defining-relationship edges in the given edge set, sorted.
    pub fn relationship_edges(&self, mode: EdgeMode) -> Vec<RelEdge> {
        self.store(mode).rel_edges()
    }
}

impl Default for ConceptGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConceptGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConceptGraph")
            .field("concepts", &self.concept_count())
            .finish()
    }
}
