//! Live-diff: change tracking against a baseline snapshot.
//!
//! A diff session captures a [`NetworkSnapshot`] baseline and classifies
//! every unit as unchanged, added, removed, or modified relative to it.
//! The comparison mode is fixed at session start: cumulative diffs always
//! compare against the original baseline; progressive diffs advance the
//! baseline after each edit and retain a per-edit changelog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, RelTypeId};

use super::EditOperation;
use super::snapshot::NetworkSnapshot;

/// How a classification unit relates to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeState {
    /// Present in both, identical.
    Unchanged,
    /// Present only in the current state.
    Added,
    /// Present only in the baseline.
    Removed,
    /// Present in both with different membership or structure.
    Modified,
}

/// Baseline handling, chosen once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffMode {
    /// Compare every diff against the original baseline.
    Cumulative,
    /// Advance the baseline after each edit and keep a changelog.
    Progressive,
}

/// One unit's change classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitChange<K> {
    /// Unit identity.
    pub key: K,
    /// Relation to the baseline.
    pub state: ChangeState,
}

/// Change classification for every unit of every layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDiff {
    /// Areas keyed by signature.
    pub areas: Vec<UnitChange<Vec<RelTypeId>>>,
    /// Partial areas keyed by label.
    pub pareas: Vec<UnitChange<ConceptId>>,
    /// Disjoint partial-areas keyed by ancestor-label set.
    pub disjoint_pareas: Vec<UnitChange<Vec<ConceptId>>>,
    /// Bands keyed by tribe set.
    pub bands: Vec<UnitChange<Vec<ConceptId>>>,
    /// Clusters keyed by label.
    pub clusters: Vec<UnitChange<ConceptId>>,
    /// Disjoint clusters keyed by ancestor-label set.
    pub disjoint_clusters: Vec<UnitChange<Vec<ConceptId>>>,
    /// Target groups keyed by (type, label).
    pub target_groups: Vec<UnitChange<(RelTypeId, ConceptId)>>,
}

impl NetworkDiff {
    /// Whether every unit in every layer is unchanged.
    pub fn is_unchanged(&self) -> bool {
        fn all_unchanged<K>(changes: &[UnitChange<K>]) -> bool {
            changes.iter().all(|c| c.state == ChangeState::Unchanged)
        }
        all_unchanged(&self.areas)
            && all_unchanged(&self.pareas)
            && all_unchanged(&self.disjoint_pareas)
            && all_unchanged(&self.bands)
            && all_unchanged(&self.clusters)
            && all_unchanged(&self.disjoint_clusters)
            && all_unchanged(&self.target_groups)
    }
}

/// Merge two keyed unit maps into per-key change states.
fn diff_units<K: Ord + Clone, V: PartialEq>(
    baseline: &BTreeMap<K, V>,
    current: &BTreeMap<K, V>,
) -> Vec<UnitChange<K>> {
    let mut out: Vec<UnitChange<K>> = Vec::new();
    for (key, value) in baseline {
        let state = match current.get(key) {
            None => ChangeState::Removed,
            Some(now) if now == value => ChangeState::Unchanged,
            Some(_) => ChangeState::Modified,
        };
        out.push(UnitChange {
            key: key.clone(),
            state,
        });
    }
    for key in current.keys() {
        if !baseline.contains_key(key) {
            out.push(UnitChange {
                key: key.clone(),
                state: ChangeState::Added,
            });
        }
    }
    out.sort_by(|a, b| a.key.cmp(&b.key));
    out
}

/// Classify every unit of `current` against `baseline`.
pub fn diff_snapshots(baseline: &NetworkSnapshot, current: &NetworkSnapshot) -> NetworkDiff {
    let areas_b: BTreeMap<_, _> = baseline
        .areas
        .iter()
        .map(|a| (a.signature.clone(), a))
        .collect();
    let areas_c: BTreeMap<_, _> = current
        .areas
        .iter()
        .map(|a| (a.signature.clone(), a))
        .collect();

    let pareas_b: BTreeMap<_, _> = baseline.pareas.iter().map(|p| (p.label, p)).collect();
    let pareas_c: BTreeMap<_, _> = current.pareas.iter().map(|p| (p.label, p)).collect();

    let dp_b: BTreeMap<_, _> = baseline
        .disjoint_pareas
        .iter()
        .map(|u| (u.key.clone(), u))
        .collect();
    let dp_c: BTreeMap<_, _> = current
        .disjoint_pareas
        .iter()
        .map(|u| (u.key.clone(), u))
        .collect();

    let bands_b: BTreeMap<_, _> = baseline
        .bands
        .iter()
        .map(|b| (b.tribes.clone(), b))
        .collect();
    let bands_c: BTreeMap<_, _> = current
        .bands
        .iter()
        .map(|b| (b.tribes.clone(), b))
        .collect();

    let clusters_b: BTreeMap<_, _> = baseline.clusters.iter().map(|c| (c.label, c)).collect();
    let clusters_c: BTreeMap<_, _> = current.clusters.iter().map(|c| (c.label, c)).collect();

    let dc_b: BTreeMap<_, _> = baseline
        .disjoint_clusters
        .iter()
        .map(|u| (u.key.clone(), u))
        .collect();
    let dc_c: BTreeMap<_, _> = current
        .disjoint_clusters
        .iter()
        .map(|u| (u.key.clone(), u))
        .collect();

    let tg_b: BTreeMap<_, _> = baseline
        .target_groups
        .iter()
        .map(|g| ((g.rel_type, g.label), g))
        .collect();
    let tg_c: BTreeMap<_, _> = current
        .target_groups
        .iter()
        .map(|g| ((g.rel_type, g.label), g))
        .collect();

    NetworkDiff {
        areas: diff_units(&areas_b, &areas_c),
        pareas: diff_units(&pareas_b, &pareas_c),
        disjoint_pareas: diff_units(&dp_b, &dp_c),
        bands: diff_units(&bands_b, &bands_c),
        clusters: diff_units(&clusters_b, &clusters_c),
        disjoint_clusters: diff_units(&dc_b, &dc_c),
        target_groups: diff_units(&tg_b, &tg_c),
    }
}

/// One applied edit with its progressive diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    /// The applied operation.
    pub op: EditOperation,
    /// Diff against the state immediately before the edit.
    pub diff: NetworkDiff,
}

/// A live-diff session: baseline snapshot plus retained edit log.
#[derive(Debug, Clone)]
pub(crate) struct DiffSession {
    mode: DiffMode,
    baseline: NetworkSnapshot,
    /// Every operation applied since the baseline was taken.
    applied: Vec<EditOperation>,
    /// Per-edit diffs; populated in progressive mode only.
    changelog: Vec<EditRecord>,
}

impl DiffSession {
    pub(crate) fn new(mode: DiffMode, baseline: NetworkSnapshot) -> Self {
        Self {
            mode,
            baseline,
            applied: Vec::new(),
            changelog: Vec::new(),
        }
    }

    pub(crate) fn mode(&self) -> DiffMode {
        self.mode
    }

    /// Record an applied edit against the post-edit snapshot.
    pub(crate) fn record(&mut self, op: EditOperation, current: &NetworkSnapshot) {
        self.applied.push(op.clone());
        if self.mode == DiffMode::Progressive {
            let diff = diff_snapshots(&self.baseline, current);
            self.changelog.push(EditRecord { op, diff });
            self.baseline = current.clone();
        }
    }

    /// Diff the current state against the session baseline.
    pub(crate) fn diff(&self, current: &NetworkSnapshot) -> NetworkDiff {
        diff_snapshots(&self.baseline, current)
    }

    /// Operations applied since the baseline was taken.
    pub(crate) fn applied(&self) -> &[EditOperation] {
        &self.applied
    }

    /// Per-edit records (progressive mode only; empty otherwise).
    pub(crate) fn changelog(&self) -> &[EditRecord] {
        &self.changelog
    }

    /// Discard history and restart from a new baseline.
    pub(crate) fn rebaseline(&mut self, current: NetworkSnapshot) {
        self.baseline = current;
        self.applied.clear();
        self.changelog.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::snapshot::AreaSnapshot;
    use crate::graph::EdgeMode;

    fn cid(id: u64) -> ConceptId {
        ConceptId::new(id).unwrap()
    }

    fn rid(id: u64) -> RelTypeId {
        RelTypeId::new(id).unwrap()
    }

    fn snapshot_with_areas(areas: Vec<AreaSnapshot>) -> NetworkSnapshot {
        NetworkSnapshot {
            mode: EdgeMode::Asserted,
            areas,
            pareas: vec![],
            disjoint_pareas: vec![],
            bands: vec![],
            clusters: vec![],
            disjoint_clusters: vec![],
            target_groups: vec![],
        }
    }

    #[test]
    fn diff_classifies_all_four_states() {
        let baseline = snapshot_with_areas(vec![
            AreaSnapshot {
                signature: vec![],
                concepts: vec![cid(1)],
            },
            AreaSnapshot {
                signature: vec![rid(10)],
                concepts: vec![cid(2)],
            },
            AreaSnapshot {
                signature: vec![rid(11)],
                concepts: vec![cid(3)],
            },
        ]);
        let current = snapshot_with_areas(vec![
            AreaSnapshot {
                signature: vec![],
                concepts: vec![cid(1)],
            },
            AreaSnapshot {
                signature: vec![rid(10)],
                concepts: vec![cid(2), cid(4)],
            },
            AreaSnapshot {
                signature: vec![rid(12)],
                concepts: vec![cid(5)],
            },
        ]);

        let diff = diff_snapshots(&baseline, &current);
        let state_of = |key: &[RelTypeId]| {
            diff.areas
                .iter()
                .find(|c| c.key == key)
                .map(|c| c.state)
                .unwrap()
        };
        assert_eq!(state_of(&[]), ChangeState::Unchanged);
        assert_eq!(state_of(&[rid(10)]), ChangeState::Modified);
        assert_eq!(state_of(&[rid(11)]), ChangeState::Removed);
        assert_eq!(state_of(&[rid(12)]), ChangeState::Added);
        assert!(!diff.is_unchanged());
    }

    #[test]
    fn identical_snapshots_diff_unchanged() {
        let snap = snapshot_with_areas(vec![AreaSnapshot {
            signature: vec![],
            concepts: vec![cid(1)],
        }]);
        assert!(diff_snapshots(&snap, &snap).is_unchanged());
    }
}
