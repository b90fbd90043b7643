//! Live abstraction networks: incremental maintenance under an edit stream.
//!
//! [`IncrementalUpdater`] owns a [`ConceptGraph`] plus every cached
//! classification layer and consumes an ordered stream of
//! [`EditOperation`]s. Each edit applies atomically — validation first,
//! then the structural mutation, then recomputation scoped to the affected
//! units — and edit N always observes the fully-applied state of edits
//! 1..N-1. The incremental result is identical to a full rebuild after the
//! same edit sequence.

pub mod diff;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::abn::parea::PareaNetwork;
use crate::abn::signature::{AreaIndex, Signature, classify};
use crate::abn::tan::{TribalNetwork, TribeConfig};
use crate::abn::target::{self, TargetNetwork};
use crate::concept::{ConceptId, ConceptMeta, RelTypeId};
use crate::error::{GraphError, OntoResult, UpdateError};
use crate::graph::{ConceptGraph, EdgeMode, RelEdge, hierarchy};

use diff::DiffSession;
pub use diff::{ChangeState, DiffMode, EditRecord, NetworkDiff, UnitChange, diff_snapshots};
pub use snapshot::NetworkSnapshot;

/// One structural edit, created by the editing collaborator and consumed
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOperation {
    /// Introduce a new concept with no edges.
    AddConcept { concept: ConceptId, label: String },
    /// Remove a concept; all incident edges cascade.
    RemoveConcept { concept: ConceptId },
    /// Add an is-a edge (child -> parent).
    AddIsA { child: ConceptId, parent: ConceptId },
    /// Remove an is-a edge.
    RemoveIsA { child: ConceptId, parent: ConceptId },
    /// Add a defining-relationship edge.
    AddRelationship {
        source: ConceptId,
        rel_type: RelTypeId,
        target: ConceptId,
    },
    /// Remove a defining-relationship edge.
    RemoveRelationship {
        source: ConceptId,
        rel_type: RelTypeId,
        target: ConceptId,
    },
}

impl std::fmt::Display for EditOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditOperation::AddConcept { concept, .. } => write!(f, "add-concept {concept}"),
            EditOperation::RemoveConcept { concept } => write!(f, "remove-concept {concept}"),
            EditOperation::AddIsA { child, parent } => write!(f, "add-is-a {child} -> {parent}"),
            EditOperation::RemoveIsA { child, parent } => {
                write!(f, "remove-is-a {child} -> {parent}")
            }
            EditOperation::AddRelationship {
                source,
                rel_type,
                target,
            } => write!(f, "add-rel {source} -[{rel_type}]-> {target}"),
            EditOperation::RemoveRelationship {
                source,
                rel_type,
                target,
            } => write!(f, "remove-rel {source} -[{rel_type}]-> {target}"),
        }
    }
}

/// Updater lifecycle: idle between edits, applying during one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    /// No edit in flight.
    Idle,
    /// One edit being applied; runs to completion or fails atomically.
    Applying,
}

/// Session configuration, fixed at start.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Edge set the session maintains networks over; edits target it too.
    pub mode: EdgeMode,
    /// Tribe roots; `Some` maintains a tribal network over the same mode.
    pub tribe_roots: Option<BTreeSet<ConceptId>>,
    /// Relationship types to maintain target networks for.
    pub target_types: Vec<RelTypeId>,
    /// Summarize target-group sources by is-a connectivity.
    pub summarize_target_sources: bool,
    /// `Some` starts a live-diff session with the given baseline handling.
    pub diff: Option<DiffMode>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            mode: EdgeMode::Asserted,
            tribe_roots: None,
            target_types: Vec::new(),
            summarize_target_sources: false,
            diff: None,
        }
    }
}

/// Recomputation work collected while applying one edit.
#[derive(Default)]
struct Pending {
    dirty_areas: HashSet<Signature>,
    invalidated: HashSet<ConceptId>,
    tan_affected: HashSet<ConceptId>,
    rebuild_targets: BTreeSet<RelTypeId>,
    rebuild_all_targets: bool,
}

/// Owns a graph and keeps every abstraction network current under edits.
pub struct IncrementalUpdater {
    graph: ConceptGraph,
    config: UpdaterConfig,
    state: UpdaterState,
    areas: AreaIndex,
    pareas: PareaNetwork,
    tan: Option<TribalNetwork>,
    targets: BTreeMap<RelTypeId, TargetNetwork>,
    diff: Option<DiffSession>,
}

impl IncrementalUpdater {
    /// Build every configured network from scratch and start the session.
    pub fn new(graph: ConceptGraph, config: UpdaterConfig) -> OntoResult<Self> {
        let mode = config.mode;
        let areas = AreaIndex::build(&graph, mode);
        let pareas = PareaNetwork::build(&graph, mode, &areas);
        let tan = match &config.tribe_roots {
            Some(roots) => Some(TribalNetwork::build(
                &graph,
                TribeConfig::new(roots.iter().copied(), mode),
            )?),
            None => None,
        };
        let targets: BTreeMap<RelTypeId, TargetNetwork> = config
            .target_types
            .iter()
            .map(|&rt| {
                (
                    rt,
                    target::build(&graph, mode, rt, config.summarize_target_sources),
                )
            })
            .collect();

        let mut updater = Self {
            graph,
            config,
            state: UpdaterState::Idle,
            areas,
            pareas,
            tan,
            targets,
            diff: None,
        };
        if let Some(diff_mode) = updater.config.diff {
            let baseline = updater.snapshot();
            updater.diff = Some(DiffSession::new(diff_mode, baseline));
        }
        tracing::info!(
            mode = %mode,
            concepts = updater.graph.concept_count(),
            areas = updater.areas.area_count(),
            diff = updater.diff.is_some(),
            "live session started"
        );
        Ok(updater)
    }

    /// Apply one edit atomically.
    ///
    /// On error the graph and every cached network are unchanged.
    pub fn apply(&mut self, op: EditOperation) -> Result<(), UpdateError> {
        self.state = UpdaterState::Applying;
        let result = self.apply_inner(&op);
        self.state = UpdaterState::Idle;
        match &result {
            Ok(()) => {
                tracing::debug!(op = %op, "applied edit");
                if self.diff.is_some() {
                    let snap = self.snapshot();
                    if let Some(session) = self.diff.as_mut() {
                        session.record(op, &snap);
                    }
                }
            }
            Err(error) => tracing::warn!(op = %op, error = %error, "edit rejected"),
        }
        result
    }

    fn apply_inner(&mut self, op: &EditOperation) -> Result<(), UpdateError> {
        let mode = self.config.mode;
        let apply_err = |op: &EditOperation, source: GraphError| UpdateError::Apply {
            op: op.to_string(),
            source,
        };
        let mut pending = Pending::default();

        match op {
            EditOperation::AddConcept { concept, label } => {
                self.graph
                    .add_concept(ConceptMeta::new(*concept, label.clone()))
                    .map_err(|e| apply_err(op, e))?;
                let sig = classify(&self.graph, mode, *concept);
                pending.dirty_areas.insert(sig.clone());
                self.areas.insert(*concept, sig);
                pending.invalidated.insert(*concept);
                pending.tan_affected.insert(*concept);
            }

            EditOperation::RemoveConcept { concept } => {
                let c = *concept;
                if !self.graph.contains_concept(c) {
                    return Err(apply_err(op, GraphError::UnknownConcept { concept: c.get() }));
                }
                // Gather everything the removal will touch before mutating.
                let desc = hierarchy::descendants(&self.graph, mode, c);
                let rel_sources: BTreeSet<ConceptId> = self
                    .graph
                    .relationship_sources(mode, c)
                    .into_iter()
                    .map(|(s, _)| s)
                    .collect();
                let mut touched_types: BTreeSet<RelTypeId> =
                    self.graph.relationship_types_of(mode, c);
                touched_types.extend(
                    self.graph
                        .relationship_sources(mode, c)
                        .into_iter()
                        .map(|(_, rt)| rt),
                );
                let neighbor_areas: Vec<Signature> = self
                    .graph
                    .parents(mode, c)
                    .into_iter()
                    .chain(self.graph.children(mode, c))
                    .filter_map(|n| self.areas.area_of(n).cloned())
                    .collect();

                self.graph.remove_concept(c).map_err(|e| apply_err(op, e))?;

                if let Some(old) = self.areas.remove(c) {
                    pending.dirty_areas.insert(old);
                }
                pending.dirty_areas.extend(neighbor_areas);
                // Cascade deletion shrank the signature of every concept
                // that pointed at the removed one.
                for src in rel_sources {
                    if src == c {
                        continue;
                    }
                    if let Some((old, new)) = self.areas.reclassify(&self.graph, mode, src) {
                        pending.dirty_areas.insert(old);
                        pending.dirty_areas.insert(new);
                        pending.invalidated.insert(src);
                        pending
                            .invalidated
                            .extend(hierarchy::descendants(&self.graph, mode, src));
                    }
                }
                pending.invalidated.extend(desc.iter().copied());
                pending.tan_affected.extend(desc);
                pending.tan_affected.insert(c);
                pending.rebuild_targets.extend(touched_types);
            }

            EditOperation::AddIsA { child, parent } | EditOperation::RemoveIsA { child, parent } => {
                match op {
                    EditOperation::AddIsA { .. } => self
                        .graph
                        .add_is_a(mode, *child, *parent)
                        .map_err(|e| apply_err(op, e))?,
                    _ => self
                        .graph
                        .remove_is_a(mode, *child, *parent)
                        .map_err(|e| apply_err(op, e))?,
                }
                for c in [*child, *parent] {
                    if let Some(sig) = self.areas.area_of(c) {
                        pending.dirty_areas.insert(sig.clone());
                    }
                }
                pending.invalidated.insert(*child);
                pending
                    .invalidated
                    .extend(hierarchy::descendants(&self.graph, mode, *child));
                pending.tan_affected = pending.invalidated.clone();
                if self.config.summarize_target_sources {
                    pending.rebuild_all_targets = true;
                }
            }

            EditOperation::AddRelationship {
                source,
                rel_type,
                target,
            }
            | EditOperation::RemoveRelationship {
                source,
                rel_type,
                target,
            } => {
                let edge = RelEdge::new(*source, *rel_type, *target);
                match op {
                    EditOperation::AddRelationship { .. } => self
                        .graph
                        .add_relationship(mode, edge)
                        .map_err(|e| apply_err(op, e))?,
                    _ => self
                        .graph
                        .remove_relationship(mode, edge)
                        .map_err(|e| apply_err(op, e))?,
                }
                if let Some((old, new)) = self.areas.reclassify(&self.graph, mode, *source) {
                    pending.dirty_areas.insert(old);
                    pending.dirty_areas.insert(new);
                    pending.invalidated.insert(*source);
                    pending
                        .invalidated
                        .extend(hierarchy::descendants(&self.graph, mode, *source));
                }
                pending.rebuild_targets.insert(*rel_type);
            }
        }

        // The mutation succeeded; recomputation below cannot fail.
        self.pareas.refresh(
            &self.graph,
            &self.areas,
            &pending.dirty_areas,
            &mut pending.invalidated,
        );
        if let Some(tan) = self.tan.as_mut() {
            let mut tan_invalidated = pending.tan_affected.clone();
            let dirty_bands = tan.update_membership(&self.graph, &pending.tan_affected);
            tan.refresh(&self.graph, &dirty_bands, &mut tan_invalidated);
        }
        let to_rebuild: Vec<RelTypeId> = if pending.rebuild_all_targets {
            self.config.target_types.clone()
        } else {
            self.config
                .target_types
                .iter()
                .copied()
                .filter(|rt| pending.rebuild_targets.contains(rt))
                .collect()
        };
        for rt in to_rebuild {
            self.targets.insert(
                rt,
                target::build(&self.graph, mode, rt, self.config.summarize_target_sources),
            );
        }
        Ok(())
    }

    /// The owned graph.
    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    /// Consume the updater, releasing the graph.
    pub fn into_graph(self) -> ConceptGraph {
        self.graph
    }

    /// Session configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> UpdaterState {
        self.state
    }

    /// The current area index.
    pub fn areas(&self) -> &AreaIndex {
        &self.areas
    }

    /// The current partial-area network.
    pub fn pareas(&self) -> &PareaNetwork {
        &self.pareas
    }

    /// The current tribal network, if configured.
    pub fn tribal(&self) -> Option<&TribalNetwork> {
        self.tan.as_ref()
    }

    /// The current target network for a configured type.
    pub fn target_network(&self, rel_type: RelTypeId) -> Option<&TargetNetwork> {
        self.targets.get(&rel_type)
    }

    /// An owned, immutable copy of every classification unit.
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot::capture(
            self.config.mode,
            &self.areas,
            &self.pareas,
            self.tan.as_ref(),
            &self.targets,
        )
    }

    /// Diff against the session baseline (live-diff sessions only).
    pub fn diff(&self) -> Option<NetworkDiff> {
        self.diff.as_ref().map(|s| s.diff(&self.snapshot()))
    }

    /// The live-diff mode, if a session is active.
    pub fn diff_mode(&self) -> Option<DiffMode> {
        self.diff.as_ref().map(|s| s.mode())
    }

    /// Operations applied since the baseline (live-diff sessions only).
    pub fn applied_ops(&self) -> &[EditOperation] {
        self.diff.as_ref().map(|s| s.applied()).unwrap_or(&[])
    }

    /// Per-edit changelog (progressive live-diff sessions only).
    pub fn changelog(&self) -> &[EditRecord] {
        self.diff.as_ref().map(|s| s.changelog()).unwrap_or(&[])
    }

    /// Restart the live-diff session from the current state.
    pub fn rebaseline(&mut self) {
        let snap = self.snapshot();
        if let Some(session) = self.diff.as_mut() {
            session.rebaseline(snap);
        }
    }
}

impl std::fmt::Debug for IncrementalUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalUpdater")
            .field("mode", &self.config.mode)
            .field("state", &self.state)
            .field("concepts", &self.graph.concept_count())
            .field("areas", &self.areas.area_count())
            .finish()
    }
}
