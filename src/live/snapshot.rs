//! Read-only snapshots of every classification unit.
//!
//! A snapshot is an owned, sorted, serializable copy. The core never mutates
//! a snapshot it has handed out — subsequent edits produce a new snapshot —
//! so rendering and persistence collaborators can hold them indefinitely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::abn::parea::PareaNetwork;
use crate::abn::signature::AreaIndex;
use crate::abn::tan::TribalNetwork;
use crate::abn::target::TargetNetwork;
use crate::concept::{ConceptId, RelTypeId};
use crate::graph::EdgeMode;

/// One area: signature and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSnapshot {
    /// Sorted member types of the signature.
    pub signature: Vec<RelTypeId>,
    /// Sorted member concepts.
    pub concepts: Vec<ConceptId>,
}

/// One partial area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PareaSnapshot {
    /// Component label (smallest member id); unique across all areas.
    pub label: ConceptId,
    /// Signature of the enclosing area.
    pub signature: Vec<RelTypeId>,
    /// Members with no is-a parent inside the partial area.
    pub roots: Vec<ConceptId>,
    /// Sorted member concepts.
    pub concepts: Vec<ConceptId>,
    /// Immediate parent partial-area labels.
    pub parents: Vec<ConceptId>,
}

/// One disjoint unit (disjoint partial-area or disjoint cluster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjointSnapshot {
    /// The exact ancestor-component label set that keys the unit.
    pub key: Vec<ConceptId>,
    /// Sorted member concepts.
    pub concepts: Vec<ConceptId>,
}

/// One tribal band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSnapshot {
    /// The exact tribe-root subset that keys the band.
    pub tribes: Vec<ConceptId>,
    /// Sorted member concepts.
    pub concepts: Vec<ConceptId>,
}

/// One cluster within a band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Component label; unique across all bands.
    pub label: ConceptId,
    /// The band this cluster lives in.
    pub band: Vec<ConceptId>,
    /// Members with no is-a parent inside the cluster.
    pub roots: Vec<ConceptId>,
    /// Sorted member concepts.
    pub concepts: Vec<ConceptId>,
}

/// One target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSnapshot {
    /// The summarized relationship type.
    pub rel_type: RelTypeId,
    /// Group label (smallest member target id).
    pub label: ConceptId,
    /// The exact source-set that keys the group.
    pub sources: Vec<ConceptId>,
    /// Sorted member targets.
    pub targets: Vec<ConceptId>,
}

/// A complete, immutable copy of every classification unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Edge set the units were computed from.
    pub mode: EdgeMode,
    /// Areas sorted by signature.
    pub areas: Vec<AreaSnapshot>,
    /// Partial areas sorted by label.
    pub pareas: Vec<PareaSnapshot>,
    /// Disjoint partial-areas sorted by key.
    pub disjoint_pareas: Vec<DisjointSnapshot>,
    /// Bands sorted by tribe set; empty when no tribal network is configured.
    pub bands: Vec<BandSnapshot>,
    /// Clusters sorted by label.
    pub clusters: Vec<ClusterSnapshot>,
    /// Disjoint clusters sorted by key.
    pub disjoint_clusters: Vec<DisjointSnapshot>,
    /// Target groups sorted by (type, label).
    pub target_groups: Vec<TargetGroupSnapshot>,
}

impl NetworkSnapshot {
    pub(crate) fn capture(
        mode: EdgeMode,
        areas: &AreaIndex,
        pareas: &PareaNetwork,
        tan: Option<&TribalNetwork>,
        targets: &BTreeMap<RelTypeId, TargetNetwork>,
    ) -> Self {
        let area_snaps: Vec<AreaSnapshot> = areas
            .signatures_sorted()
            .into_iter()
            .map(|sig| AreaSnapshot {
                signature: sig.types().collect(),
                concepts: areas
                    .area(sig)
                    .map(|a| a.concepts().iter().copied().collect())
                    .unwrap_or_default(),
            })
            .collect();

        let mut parea_snaps: Vec<PareaSnapshot> = pareas
            .partitions_sorted()
            .into_iter()
            .flat_map(|(sig, partition)| {
                partition.components.iter().map(|component| PareaSnapshot {
                    label: component.label,
                    signature: sig.types().collect(),
                    roots: component.roots.iter().copied().collect(),
                    concepts: component.concepts.iter().copied().collect(),
                    parents: pareas
                        .parent_pareas(component.label)
                        .map(|p| p.iter().copied().collect())
                        .unwrap_or_default(),
                })
            })
            .collect();
        parea_snaps.sort_by_key(|p| p.label);

        let disjoint_pareas = pareas
            .disjoint_units()
            .iter()
            .map(|u| DisjointSnapshot {
                key: u.key.iter().copied().collect(),
                concepts: u.concepts.iter().copied().collect(),
            })
            .collect();

        let (bands, clusters, disjoint_clusters) = match tan {
            Some(tan) => {
                let bands = tan
                    .bands_sorted()
                    .into_iter()
                    .map(|(key, members)| BandSnapshot {
                        tribes: key.iter().copied().collect(),
                        concepts: members.iter().copied().collect(),
                    })
                    .collect();
                let mut cluster_snaps: Vec<ClusterSnapshot> = tan
                    .bands_sorted()
                    .into_iter()
                    .filter_map(|(key, _)| tan.clusters(key).map(|p| (key, p)))
                    .flat_map(|(key, partition)| {
                        partition.components.iter().map(|component| ClusterSnapshot {
                            label: component.label,
                            band: key.iter().copied().collect(),
                            roots: component.roots.iter().copied().collect(),
                            concepts: component.concepts.iter().copied().collect(),
                        })
                    })
                    .collect();
                cluster_snaps.sort_by_key(|c| c.label);
                let disjoint = tan
                    .disjoint_units()
                    .iter()
                    .map(|u| DisjointSnapshot {
                        key: u.key.iter().copied().collect(),
                        concepts: u.concepts.iter().copied().collect(),
                    })
                    .collect();
                (bands, cluster_snaps, disjoint)
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let target_groups = targets
            .values()
            .flat_map(|net| {
                net.groups.iter().map(|g| TargetGroupSnapshot {
                    rel_type: net.rel_type,
                    label: g.label,
                    sources: g.sources.iter().copied().collect(),
                    targets: g.targets.iter().copied().collect(),
                })
            })
            .collect();

        Self {
            mode,
            areas: area_snaps,
            pareas: parea_snaps,
            disjoint_pareas,
            bands,
            clusters,
            disjoint_clusters,
            target_groups,
        }
    }

    /// Total concepts across areas (each concept counted once).
    pub fn concept_count(&self) -> usize {
        self.areas.iter().map(|a| a.concepts.len()).sum()
    }
}
