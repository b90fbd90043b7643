//! Relationship signatures and the area index.
//!
//! A concept's signature is the set of relationship types it *directly*
//! instantiates — inheritance plays no part. Areas are the maximal concept
//! sets sharing one signature; they are derived, never persisted, and the
//! index regenerates them deterministically from the graph.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, RelTypeId};
use crate::graph::{ConceptGraph, EdgeMode};

use super::partition::GroupLookup;

/// The set of relationship types a concept directly instantiates.
///
/// Backed by a `BTreeSet`, so equality, hashing, and ordering are all
/// deterministic functions of the member types.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Signature(BTreeSet<RelTypeId>);

impl Signature {
    /// The empty signature (no defining relationships).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a signature from relationship types.
    pub fn from_types(types: impl IntoIterator<Item = RelTypeId>) -> Self {
        Self(types.into_iter().collect())
    }

    /// The member types in ascending order.
    pub fn types(&self) -> impl Iterator<Item = RelTypeId> + '_ {
        self.0.iter().copied()
    }

    /// Number of member types.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the signature has no member types.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the signature contains the given type.
    pub fn contains(&self, rel_type: RelTypeId) -> bool {
        self.0.contains(&rel_type)
    }

    /// Strict subset test, used to orient partial-area child-of edges.
    pub fn is_strict_subset_of(&self, other: &Signature) -> bool {
        self.0.is_subset(&other.0) && self.0 != other.0
    }

    /// Display name: sorted type labels joined by ", ", or "∅" when empty.
    pub fn display_name(&self, graph: &ConceptGraph) -> String {
        if self.0.is_empty() {
            return "∅".to_string();
        }
        let mut labels: Vec<String> = self.0.iter().map(|&rt| graph.rel_label(rt)).collect();
        labels.sort();
        labels.join(", ")
    }
}

/// Compute a concept's signature from its direct relationship edges.
///
/// O(out-degree); never consults ancestors.
pub fn classify(graph: &ConceptGraph, mode: EdgeMode, concept: ConceptId) -> Signature {
    Signature(graph.relationship_types_of(mode, concept))
}

/// The maximal set of concepts sharing one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    signature: Signature,
    concepts: BTreeSet<ConceptId>,
}

impl Area {
    /// The signature that is this area's identity.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Member concepts, sorted.
    pub fn concepts(&self) -> &BTreeSet<ConceptId> {
        &self.concepts
    }

    /// Number of member concepts.
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the area has no members.
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Display name, delegated to the signature.
    pub fn name(&self, graph: &ConceptGraph) -> String {
        self.signature.display_name(graph)
    }
}

/// Concept -> area classification for one edge set.
///
/// Areas partition the concept set: every concept is in exactly one area,
/// and an area's identity is its signature value.
#[derive(Debug, Clone, Default)]
pub struct AreaIndex {
    areas: HashMap<Signature, Area>,
    area_of: HashMap<ConceptId, Signature>,
}

impl AreaIndex {
    /// Classify every concept and group by signature.
    pub fn build(graph: &ConceptGraph, mode: EdgeMode) -> Self {
        let ids = graph.concept_ids();
        let classified: Vec<(ConceptId, Signature)> = ids
            .par_iter()
            .map(|&c| (c, classify(graph, mode, c)))
            .collect();

        let mut index = Self::default();
        for (concept, signature) in classified {
            index.insert(concept, signature);
        }
        tracing::debug!(
            mode = %mode,
            areas = index.area_count(),
            concepts = index.concept_count(),
            "built area index"
        );
        index
    }

    /// The signature of the area containing a concept.
    pub fn area_of(&self, concept: ConceptId) -> Option<&Signature> {
        self.area_of.get(&concept)
    }

    /// The area with the given signature, if any concept carries it.
    pub fn area(&self, signature: &Signature) -> Option<&Area> {
        self.areas.get(signature)
    }

    /// All areas, unordered.
    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    /// All signatures, sorted.
    pub fn signatures_sorted(&self) -> Vec<&Signature> {
        let mut sigs: Vec<&Signature> = self.areas.keys().collect();
        sigs.sort();
        sigs
    }

    /// Number of areas.
    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    /// Number of classified concepts.
    pub fn concept_count(&self) -> usize {
        self.area_of.len()
    }

    /// Insert a concept under a signature, creating the area lazily.
    pub fn insert(&mut self, concept: ConceptId, signature: Signature) {
        self.areas
            .entry(signature.clone())
            .or_insert_with(|| Area {
                signature: signature.clone(),
                concepts: BTreeSet::new(),
            })
            .concepts
            .insert(concept);
        self.area_of.insert(concept, signature);
    }

    /// Remove a concept from the index, dropping its area if it empties.
    pub fn remove(&mut self, concept: ConceptId) -> Option<Signature> {
        let signature = self.area_of.remove(&concept)?;
        if let Some(area) = self.areas.get_mut(&signature) {
            area.concepts.remove(&concept);
            if area.concepts.is_empty() {
                self.areas.remove(&signature);
            }
        }
        Some(signature)
    }

    /// Reclassify one concept after its relationship edges changed.
    ///
    /// Returns `(old, new)` if the concept moved areas; `None` if its
    /// signature is unchanged.
    pub fn reclassify(
        &mut self,
        graph: &ConceptGraph,
        mode: EdgeMode,
        concept: ConceptId,
    ) -> Option<(Signature, Signature)> {
        let new = classify(graph, mode, concept);
        let old = self.area_of.get(&concept).cloned();
        if old.as_ref() == Some(&new) {
            return None;
        }
        let old = old?;
        self.remove(concept);
        self.insert(concept, new.clone());
        Some((old, new))
    }
}

impl GroupLookup<Signature> for AreaIndex {
    fn group_keys(&self) -> Vec<Signature> {
        self.areas.keys().cloned().collect()
    }

    fn group_members(&self, key: &Signature) -> Option<&BTreeSet<ConceptId>> {
        self.areas.get(key).map(|a| &a.concepts)
    }
}
