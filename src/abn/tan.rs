//! Tribal abstraction networks: bands, clusters, disjoint clusters.
//!
//! A tribe is the subhierarchy rooted at a user-chosen concept. Concepts are
//! banded by the exact subset of tribe roots they descend from (roots count
//! as their own descendants); concepts under no tribe are excluded. Clusters
//! and disjoint clusters run the partial-area machinery scoped to bands.

use std::collections::{BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;
use crate::error::TanError;
use crate::graph::{ConceptGraph, EdgeMode, hierarchy};

use super::partition::{ComponentPartition, DisjointUnit, GroupLookup, GroupedPartition};

/// Band identity: the exact set of tribe roots a concept descends from.
pub type BandKey = BTreeSet<ConceptId>;

/// Tribe selection for a tribal abstraction network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TribeConfig {
    /// Root concepts whose subhierarchies define the tribes.
    pub roots: BTreeSet<ConceptId>,
    /// Which edge set descent is computed over.
    pub mode: EdgeMode,
}

impl TribeConfig {
    /// Create a configuration over the given roots and edge set.
    pub fn new(roots: impl IntoIterator<Item = ConceptId>, mode: EdgeMode) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            mode,
        }
    }

    /// Validate the root set against a graph.
    pub fn validate(&self, graph: &ConceptGraph) -> Result<(), TanError> {
        if self.roots.is_empty() {
            return Err(TanError::EmptyTribes);
        }
        for &root in &self.roots {
            if !graph.contains_concept(root) {
                return Err(TanError::UnknownRoot {
                    concept: root.get(),
                });
            }
        }
        Ok(())
    }
}

/// Band memberships: band key -> concepts, concept -> band key.
#[derive(Debug, Clone, Default)]
struct BandIndex {
    bands: HashMap<BandKey, BTreeSet<ConceptId>>,
    band_of: HashMap<ConceptId, BandKey>,
}

impl BandIndex {
    fn insert(&mut self, concept: ConceptId, key: BandKey) {
        self.bands.entry(key.clone()).or_default().insert(concept);
        self.band_of.insert(concept, key);
    }

    fn remove(&mut self, concept: ConceptId) -> Option<BandKey> {
        let key = self.band_of.remove(&concept)?;
        if let Some(members) = self.bands.get_mut(&key) {
            members.remove(&concept);
            if members.is_empty() {
                self.bands.remove(&key);
            }
        }
        Some(key)
    }
}

impl GroupLookup<BandKey> for BandIndex {
    fn group_keys(&self) -> Vec<BandKey> {
        self.bands.keys().cloned().collect()
    }

    fn group_members(&self, key: &BandKey) -> Option<&BTreeSet<ConceptId>> {
        self.bands.get(key)
    }
}

/// A tribal abstraction network over one edge set.
///
/// Asserted- and inferred-mode networks are separate values built from
/// separate edge sets; nothing is ever merged between them.
#[derive(Debug, Clone)]
pub struct TribalNetwork {
    config: TribeConfig,
    bands: BandIndex,
    grouped: GroupedPartition<BandKey>,
}

impl TribalNetwork {
    /// Band every concept and partition the bands into clusters.
    pub fn build(graph: &ConceptGraph, config: TribeConfig) -> Result<Self, TanError> {
        config.validate(graph)?;

        // One downward sweep per root, in parallel; merged into per-concept
        // descent subsets.
        let descents: Vec<(ConceptId, HashSet<ConceptId>)> = config
            .roots
            .par_iter()
            .map(|&root| (root, hierarchy::subhierarchy(graph, config.mode, root)))
            .collect();

        let mut membership: HashMap<ConceptId, BandKey> = HashMap::new();
        for (root, reached) in descents {
            for concept in reached {
                membership.entry(concept).or_default().insert(root);
            }
        }

        let mut bands = BandIndex::default();
        for (concept, key) in membership {
            bands.insert(concept, key);
        }

        let grouped = GroupedPartition::build(graph, config.mode, &bands);
        tracing::debug!(
            mode = %config.mode,
            tribes = config.roots.len(),
            bands = bands.bands.len(),
            "built tribal network"
        );
        Ok(Self {
            config,
            bands,
            grouped,
        })
    }

    /// The configuration this network was built from.
    pub fn config(&self) -> &TribeConfig {
        &self.config
    }

    /// All (band key, members) pairs, sorted by key.
    pub fn bands_sorted(&self) -> Vec<(&BandKey, &BTreeSet<ConceptId>)> {
        let mut out: Vec<(&BandKey, &BTreeSet<ConceptId>)> = self.bands.bands.iter().collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// The band a concept belongs to; `None` for concepts outside every tribe.
    pub fn band_of(&self, concept: ConceptId) -> Option<&BandKey> {
        self.bands.band_of.get(&concept)
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.bands.bands.len()
    }

    /// The cluster partition of one band.
    pub fn clusters(&self, key: &BandKey) -> Option<&ComponentPartition> {
        self.grouped.partition(key)
    }

    /// The cluster label a concept belongs to.
    pub fn cluster_of(&self, concept: ConceptId) -> Option<ConceptId> {
        self.grouped.component_of(concept)
    }

    /// The exact set of cluster labels reachable through ancestor is-a
    /// edges (own cluster included).
    pub fn ancestor_clusters(&self, concept: ConceptId) -> Option<&BTreeSet<ConceptId>> {
        self.grouped.ancestor_set(concept)
    }

    /// Disjoint clusters: banded concepts grouped by exact ancestor sets.
    pub fn disjoint_units(&self) -> &[DisjointUnit] {
        self.grouped.disjoint_units()
    }

    /// Recompute band membership for the affected concepts.
    ///
    /// Membership of a concept is `roots ∩ ({concept} ∪ ancestors)`, so only
    /// concepts in a mutated descendant cone can change. Returns the band
    /// keys whose membership changed.
    pub(crate) fn update_membership(
        &mut self,
        graph: &ConceptGraph,
        affected: &HashSet<ConceptId>,
    ) -> HashSet<BandKey> {
        let mode = self.config.mode;
        let mut dirty: HashSet<BandKey> = HashSet::new();
        for &concept in affected {
            let old = if graph.contains_concept(concept) {
                let mut up = hierarchy::ancestors(graph, mode, concept);
                up.insert(concept);
                let key: BandKey = self
                    .config
                    .roots
                    .iter()
                    .copied()
                    .filter(|r| up.contains(r))
                    .collect();
                if key.is_empty() {
                    self.bands.remove(concept)
                } else {
                    let unchanged = self
                        .bands
                        .band_of
                        .get(&concept)
                        .is_some_and(|existing| *existing == key);
                    if unchanged {
                        continue;
                    }
                    let old = self.bands.remove(concept);
                    self.bands.insert(concept, key.clone());
                    dirty.insert(key);
                    old
                }
            } else {
                self.bands.remove(concept)
            };
            if let Some(old_key) = old {
                dirty.insert(old_key);
            }
        }
        dirty
    }

    /// Re-partition dirty bands and refresh the ancestor/disjoint layers.
    pub(crate) fn refresh(
        &mut self,
        graph: &ConceptGraph,
        dirty_bands: &HashSet<BandKey>,
        invalidated: &mut HashSet<ConceptId>,
    ) {
        let mode = self.config.mode;
        let changed = self
            .grouped
            .rebuild_groups(graph, mode, &self.bands, dirty_bands);
        for &c in &changed {
            if graph.contains_concept(c) {
                invalidated.insert(c);
                invalidated.extend(hierarchy::descendants(graph, mode, c));
            }
        }
        self.grouped.refresh_ancestors(graph, mode, invalidated);
        self.grouped.rebuild_disjoint();
    }
}
