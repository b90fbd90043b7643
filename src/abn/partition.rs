//! Shared partitioning machinery: connected components and disjoint units.
//!
//! Partial areas and tribal clusters run the same two algorithms over
//! different groupings, so both live here once:
//!
//! 1. [`connected_components`] — weakly-connected components of the is-a
//!    subgraph induced on a member set, labeled by smallest member id.
//! 2. [`GroupedPartition`] — component partitions for a whole family of
//!    groups, plus per-concept ancestor-component sets (memoized, invalidated
//!    only along mutated descendant cones) and the disjoint units derived
//!    from them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;
use crate::graph::{ConceptGraph, EdgeMode};

/// A weakly-connected component of an induced is-a subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Stable component label: the smallest member id.
    pub label: ConceptId,
    /// Member concepts.
    pub concepts: BTreeSet<ConceptId>,
    /// Members with no is-a parent inside the component.
    pub roots: BTreeSet<ConceptId>,
}

/// The component partition of one member set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPartition {
    /// Components sorted by label.
    pub components: Vec<Component>,
    component_of: HashMap<ConceptId, ConceptId>,
}

impl ComponentPartition {
    /// The label of the component containing `concept`, if it is a member.
    pub fn component_of(&self, concept: ConceptId) -> Option<ConceptId> {
        self.component_of.get(&concept).copied()
    }

    /// The component carrying the given label.
    pub fn component(&self, label: ConceptId) -> Option<&Component> {
        self.components
            .binary_search_by_key(&label, |c| c.label)
            .ok()
            .map(|i| &self.components[i])
    }

    /// Total member count across components.
    pub fn concept_count(&self) -> usize {
        self.component_of.len()
    }
}

/// Compute the weakly-connected components of the is-a subgraph induced on
/// `members`. Edges with an endpoint outside `members` are ignored; edge
/// direction is ignored for connectivity. Component labels are the smallest
/// member id, so the result is identical across runs on identical input.
pub fn connected_components(
    graph: &ConceptGraph,
    mode: EdgeMode,
    members: &BTreeSet<ConceptId>,
) -> ComponentPartition {
    let index: HashMap<ConceptId, usize> = members
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();
    let mut uf: UnionFind<usize> = UnionFind::new(members.len());

    for &concept in members {
        for parent in graph.parents(mode, concept) {
            if let Some(&pi) = index.get(&parent) {
                uf.union(index[&concept], pi);
            }
        }
    }

    // Members iterate in ascending id order, so the first member seen for a
    // set representative is the smallest — that id becomes the label.
    let mut label_of_rep: HashMap<usize, ConceptId> = HashMap::new();
    let mut grouped: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();
    let mut component_of: HashMap<ConceptId, ConceptId> = HashMap::new();
    for &concept in members {
        let rep = uf.find(index[&concept]);
        let label = *label_of_rep.entry(rep).or_insert(concept);
        grouped.entry(label).or_default().insert(concept);
        component_of.insert(concept, label);
    }

    let components = grouped
        .into_iter()
        .map(|(label, concepts)| {
            let roots = concepts
                .iter()
                .copied()
                .filter(|&c| {
                    !graph
                        .parents(mode, c)
                        .iter()
                        .any(|p| concepts.contains(p))
                })
                .collect();
            Component {
                label,
                concepts,
                roots,
            }
        })
        .collect();

    ComponentPartition {
        components,
        component_of,
    }
}

/// A disjoint unit: concepts sharing an identical ancestor-component set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjointUnit {
    /// The exact set of component labels the members descend from.
    pub key: BTreeSet<ConceptId>,
    /// Member concepts.
    pub concepts: BTreeSet<ConceptId>,
}

/// Source of group memberships for a [`GroupedPartition`].
pub trait GroupLookup<K> {
    /// All group keys currently present.
    fn group_keys(&self) -> Vec<K>;
    /// Members of one group, or `None` if the group no longer exists.
    fn group_members(&self, key: &K) -> Option<&BTreeSet<ConceptId>>;
}

/// Component partitions for a family of disjoint groups, with the derived
/// disjoint units.
///
/// Holds the per-concept ancestor-component cache the disjoint step depends
/// on; recomputing it globally on every edit would be O(concepts × ancestors),
/// so invalidation is scoped to the descendant cones the caller passes in.
#[derive(Debug, Clone)]
pub struct GroupedPartition<K> {
    partitions: HashMap<K, ComponentPartition>,
    /// Global concept -> component label map. Labels are unique across
    /// groups because a label is the smallest id of a disjoint member set.
    component_of: HashMap<ConceptId, ConceptId>,
    /// Concept -> exact set of component labels reachable via ancestor
    /// is-a edges (own component included). Maintained for every concept in
    /// the graph, membership or not: concepts outside every group still
    /// forward their ancestors' components to their descendants.
    ancestor_sets: HashMap<ConceptId, BTreeSet<ConceptId>>,
    disjoint: Vec<DisjointUnit>,
}

impl<K: Clone + Eq + Hash + Ord> GroupedPartition<K> {
    /// Partition every group and derive the disjoint units.
    pub fn build(graph: &ConceptGraph, mode: EdgeMode, lookup: &impl GroupLookup<K>) -> Self {
        let mut this = Self {
            partitions: HashMap::new(),
            component_of: HashMap::new(),
            ancestor_sets: HashMap::new(),
            disjoint: Vec::new(),
        };
        for key in lookup.group_keys() {
            let members = lookup
                .group_members(&key)
                .expect("group key without members");
            let partition = connected_components(graph, mode, members);
            this.component_of.extend(
                members
                    .iter()
                    .filter_map(|&c| partition.component_of(c).map(|l| (c, l))),
            );
            this.partitions.insert(key, partition);
        }
        let all: HashSet<ConceptId> = graph.concept_ids().into_iter().collect();
        this.recompute_ancestors(graph, mode, &all);
        this.rebuild_disjoint();
        this
    }

    /// Re-partition the given groups against fresh memberships.
    ///
    /// Returns every concept whose component label changed (including
    /// concepts that joined or left a group); the caller extends its
    /// invalidation cone with their descendants.
    pub fn rebuild_groups(
        &mut self,
        graph: &ConceptGraph,
        mode: EdgeMode,
        lookup: &impl GroupLookup<K>,
        dirty: &HashSet<K>,
    ) -> HashSet<ConceptId> {
        // Two phases so a concept moving between two dirty groups is seen
        // with its final label regardless of key order.
        let mut touched: HashSet<ConceptId> = HashSet::new();
        let mut new_labels: HashMap<ConceptId, ConceptId> = HashMap::new();

        for key in dirty {
            if let Some(old) = self.partitions.remove(key) {
                touched.extend(old.component_of.keys().copied());
            }
            let new = lookup
                .group_members(key)
                .filter(|m| !m.is_empty())
                .map(|members| connected_components(graph, mode, members));
            if let Some(partition) = new {
                touched.extend(partition.component_of.keys().copied());
                new_labels.extend(
                    partition
                        .component_of
                        .iter()
                        .map(|(&c, &label)| (c, label)),
                );
                self.partitions.insert(key.clone(), partition);
            }
        }

        let mut changed: HashSet<ConceptId> = HashSet::new();
        for &c in &touched {
            let before = self.component_of.get(&c).copied();
            let after = new_labels.get(&c).copied();
            if before != after {
                changed.insert(c);
            }
            match after {
                Some(label) => {
                    self.component_of.insert(c, label);
                }
                // Left every dirty group; a move into a non-dirty group is
                // impossible because the caller marks both sides dirty.
                None => {
                    self.component_of.remove(&c);
                }
            }
        }
        changed
    }

    /// Recompute ancestor-component sets for the invalidated concepts.
    ///
    /// The invalidated set must already contain the full descendant cone of
    /// every mutated concept; entries for concepts no longer in the graph are
    /// pruned here.
    pub fn refresh_ancestors(
        &mut self,
        graph: &ConceptGraph,
        mode: EdgeMode,
        invalidated: &HashSet<ConceptId>,
    ) {
        self.ancestor_sets.retain(|c, _| graph.contains_concept(*c));
        self.component_of.retain(|c, _| graph.contains_concept(*c));
        let stale: HashSet<ConceptId> = invalidated
            .iter()
            .copied()
            .filter(|c| graph.contains_concept(*c))
            .collect();
        self.recompute_ancestors(graph, mode, &stale);
    }

    /// Iterative memoized pass: `anc(c) = component(c) ∪ ⋃ anc(parent)`.
    /// Parents outside `stale` use their cached sets; a back edge in a cyclic
    /// input is skipped rather than diverging.
    fn recompute_ancestors(
        &mut self,
        graph: &ConceptGraph,
        mode: EdgeMode,
        stale: &HashSet<ConceptId>,
    ) {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            InProgress,
            Done,
        }
        let mut state: HashMap<ConceptId, State> = HashMap::new();
        let mut stack: Vec<ConceptId> = Vec::new();

        let mut targets: Vec<ConceptId> = stale.iter().copied().collect();
        targets.sort_unstable();

        for start in targets {
            if state.get(&start) == Some(&State::Done) {
                continue;
            }
            stack.push(start);
            while let Some(&c) = stack.last() {
                match state.get(&c).copied() {
                    Some(State::Done) => {
                        stack.pop();
                    }
                    Some(State::InProgress) => {
                        let mut set: BTreeSet<ConceptId> = BTreeSet::new();
                        if let Some(&label) = self.component_of.get(&c) {
                            set.insert(label);
                        }
                        for p in graph.parents(mode, c) {
                            if stale.contains(&p) && state.get(&p) == Some(&State::InProgress) {
                                continue; // cycle back edge
                            }
                            if let Some(parent_set) = self.ancestor_sets.get(&p) {
                                set.extend(parent_set.iter().copied());
                            }
                        }
                        self.ancestor_sets.insert(c, set);
                        state.insert(c, State::Done);
                        stack.pop();
                    }
                    None => {
                        state.insert(c, State::InProgress);
                        for p in graph.parents(mode, c) {
                            if stale.contains(&p) && !state.contains_key(&p) {
                                stack.push(p);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Regroup all member concepts by their exact ancestor-component set.
    pub fn rebuild_disjoint(&mut self) {
        let mut grouped: BTreeMap<BTreeSet<ConceptId>, BTreeSet<ConceptId>> = BTreeMap::new();
        for &c in self.component_of.keys() {
            let key = self
                .ancestor_sets
                .get(&c)
                .cloned()
                .unwrap_or_default();
            grouped.entry(key).or_default().insert(c);
        }
        self.disjoint = grouped
            .into_iter()
            .map(|(key, concepts)| DisjointUnit { key, concepts })
            .collect();
    }

    /// The component partition of one group.
    pub fn partition(&self, key: &K) -> Option<&ComponentPartition> {
        self.partitions.get(key)
    }

    /// All (key, partition) pairs, sorted by key.
    pub fn partitions_sorted(&self) -> Vec<(&K, &ComponentPartition)> {
        let mut out: Vec<(&K, &ComponentPartition)> = self.partitions.iter().collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// The component label a concept belongs to, if any.
    pub fn component_of(&self, concept: ConceptId) -> Option<ConceptId> {
        self.component_of.get(&concept).copied()
    }

    /// The exact set of ancestor component labels for a concept.
    pub fn ancestor_set(&self, concept: ConceptId) -> Option<&BTreeSet<ConceptId>> {
        self.ancestor_sets.get(&concept)
    }

    /// The disjoint units, sorted by key.
    pub fn disjoint_units(&self) -> &[DisjointUnit] {
        &self.disjoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptMeta;

    fn cid(id: u64) -> ConceptId {
        ConceptId::new(id).unwrap()
    }

    fn graph_with(ids: &[u64], is_a: &[(u64, u64)]) -> ConceptGraph {
        let g = ConceptGraph::new();
        for &id in ids {
            g.add_concept(ConceptMeta::new(cid(id), format!("c{id}")))
                .unwrap();
        }
        for &(c, p) in is_a {
            g.add_is_a(EdgeMode::Asserted, cid(c), cid(p)).unwrap();
        }
        g
    }

    fn set(ids: &[u64]) -> BTreeSet<ConceptId> {
        ids.iter().map(|&i| cid(i)).collect()
    }

    #[test]
    fn components_ignore_edges_leaving_the_set() {
        // 1 -> 2 -> 5, 3 -> 4; members {1, 2, 3, 4}: the 2 -> 5 edge is out.
        let g = graph_with(&[1, 2, 3, 4, 5], &[(1, 2), (2, 5), (3, 4)]);
        let members = set(&[1, 2, 3, 4]);
        let p = connected_components(&g, EdgeMode::Asserted, &members);

        assert_eq!(p.components.len(), 2);
        assert_eq!(p.components[0].label, cid(1));
        assert_eq!(p.components[0].concepts, set(&[1, 2]));
        assert_eq!(p.components[1].label, cid(3));
        assert_eq!(p.component_of(cid(4)), Some(cid(3)));
        assert_eq!(p.component_of(cid(5)), None);
    }

    #[test]
    fn components_are_undirected() {
        // 1 and 3 both is-a 2: one component even though 1 and 3 share no edge.
        let g = graph_with(&[1, 2, 3], &[(1, 2), (3, 2)]);
        let p = connected_components(&g, EdgeMode::Asserted, &set(&[1, 2, 3]));
        assert_eq!(p.components.len(), 1);
        assert_eq!(p.components[0].label, cid(1));
    }

    #[test]
    fn component_roots_have_no_in_set_parent() {
        let g = graph_with(&[1, 2, 3], &[(1, 2), (3, 2)]);
        let p = connected_components(&g, EdgeMode::Asserted, &set(&[1, 2, 3]));
        assert_eq!(p.components[0].roots, set(&[2]));
    }

    #[test]
    fn partition_is_idempotent() {
        let g = graph_with(&[1, 2, 3, 4], &[(1, 2), (3, 4)]);
        let members = set(&[1, 2, 3, 4]);
        let a = connected_components(&g, EdgeMode::Asserted, &members);
        let b = connected_components(&g, EdgeMode::Asserted, &members);
        assert_eq!(a, b);
    }

    // A two-group lookup for GroupedPartition tests.
    struct Groups(HashMap<u8, BTreeSet<ConceptId>>);

    impl GroupLookup<u8> for Groups {
        fn group_keys(&self) -> Vec<u8> {
            let mut keys: Vec<u8> = self.0.keys().copied().collect();
            keys.sort_unstable();
            keys
        }
        fn group_members(&self, key: &u8) -> Option<&BTreeSet<ConceptId>> {
            self.0.get(key)
        }
    }

    /// 5 is-a {3, 4}, 3 is-a 1, 4 is-a 2; groups: {1, 2} and {3, 4, 5}.
    /// Group {3, 4, 5} is one component (3 and 4 connect through 5);
    /// group {1, 2} splits in two.
    fn grouped_fixture() -> (ConceptGraph, Groups) {
        let g = graph_with(&[1, 2, 3, 4, 5], &[(5, 3), (5, 4), (3, 1), (4, 2)]);
        let mut groups = HashMap::new();
        groups.insert(1u8, set(&[1, 2]));
        groups.insert(2u8, set(&[3, 4, 5]));
        (g, Groups(groups))
    }

    #[test]
    fn grouped_build_components_and_ancestors() {
        let (g, lookup) = grouped_fixture();
        let gp = GroupedPartition::build(&g, EdgeMode::Asserted, &lookup);

        // Group 1 splits into {1} and {2}; group 2 is one component.
        let p1 = gp.partition(&1).unwrap();
        assert_eq!(p1.components.len(), 2);
        let p2 = gp.partition(&2).unwrap();
        assert_eq!(p2.components.len(), 1);
        assert_eq!(p2.components[0].label, cid(3));

        // 5 ancestors: own component {3}, plus components of 1 and 2.
        assert_eq!(gp.ancestor_set(cid(5)).unwrap(), &set(&[1, 2, 3]));
        // 3 ancestors: own component plus 1's.
        assert_eq!(gp.ancestor_set(cid(3)).unwrap(), &set(&[1, 3]));
        // 1 is a top concept: only its own component.
        assert_eq!(gp.ancestor_set(cid(1)).unwrap(), &set(&[1]));
    }

    #[test]
    fn grouped_disjoint_units_key_on_exact_sets() {
        let (g, lookup) = grouped_fixture();
        let gp = GroupedPartition::build(&g, EdgeMode::Asserted, &lookup);

        let units = gp.disjoint_units();
        let keys: Vec<&BTreeSet<ConceptId>> = units.iter().map(|u| &u.key).collect();
        assert!(keys.contains(&&set(&[1])));
        assert!(keys.contains(&&set(&[2])));
        assert!(keys.contains(&&set(&[1, 3])));
        assert!(keys.contains(&&set(&[2, 3])));
        assert!(keys.contains(&&set(&[1, 2, 3])));

        // Every member concept appears in exactly one unit.
        let mut seen: BTreeSet<ConceptId> = BTreeSet::new();
        for unit in units {
            for &c in &unit.concepts {
                assert!(seen.insert(c), "{c} appears twice");
            }
        }
        assert_eq!(seen, set(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn rebuild_groups_reports_changed_components() {
        let (g, lookup) = grouped_fixture();
        let mut gp = GroupedPartition::build(&g, EdgeMode::Asserted, &lookup);

        // Move 5 out of group 2 into group 1.
        let mut groups = HashMap::new();
        groups.insert(1u8, set(&[1, 2, 5]));
        groups.insert(2u8, set(&[3, 4]));
        let lookup = Groups(groups);

        let dirty: HashSet<u8> = [1u8, 2u8].into_iter().collect();
        let changed = gp.rebuild_groups(&g, EdgeMode::Asserted, &lookup, &dirty);

        // 5 changed components; 3 and 4 split into two components, and 4's
        // label moved from 3 to 4.
        assert!(changed.contains(&cid(5)));
        assert!(changed.contains(&cid(4)));
        assert_eq!(gp.component_of(cid(5)), Some(cid(5)));
        assert_eq!(gp.component_of(cid(4)), Some(cid(4)));
        assert_eq!(gp.partition(&2).unwrap().components.len(), 2);
    }

    #[test]
    fn refresh_ancestors_prunes_removed_concepts() {
        let (g, lookup) = grouped_fixture();
        let mut gp = GroupedPartition::build(&g, EdgeMode::Asserted, &lookup);
        g.remove_concept(cid(5)).unwrap();
        gp.refresh_ancestors(&g, EdgeMode::Asserted, &HashSet::new());
        assert!(gp.ancestor_set(cid(5)).is_none());
    }
}
