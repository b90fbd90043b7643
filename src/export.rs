//! Export types for serializing classification state.
//!
//! These types provide human-readable, label-resolved representations of
//! every classification unit, suitable for JSON export to a persistence
//! collaborator. Structural completeness holds by construction: the export
//! mirrors a [`NetworkSnapshot`], where every concept is accounted for in
//! exactly one unit per classification type.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::graph::ConceptGraph;
use crate::live::NetworkSnapshot;

/// Exported concept with resolved label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptExport {
    /// Numeric concept id.
    pub id: u64,
    /// Human-readable label.
    pub label: String,
}

/// Exported area with resolved signature labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaExport {
    /// Area display name (sorted type labels, "∅" for the empty signature).
    pub name: String,
    /// Signature type ids.
    pub signature: Vec<u64>,
    /// Member concepts.
    pub concepts: Vec<ConceptExport>,
}

/// Exported partial area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PareaExport {
    /// Component label id.
    pub label: u64,
    /// Display name of the root concept carrying the label.
    pub label_name: String,
    /// Enclosing area signature type ids.
    pub signature: Vec<u64>,
    /// Root concept ids.
    pub roots: Vec<u64>,
    /// Member concepts.
    pub concepts: Vec<ConceptExport>,
    /// Immediate parent partial-area labels.
    pub parents: Vec<u64>,
}

/// Exported disjoint unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisjointExport {
    /// Ancestor-component label set.
    pub key: Vec<u64>,
    /// Member concepts.
    pub concepts: Vec<ConceptExport>,
}

/// Exported band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandExport {
    /// Tribe roots keying the band.
    pub tribes: Vec<ConceptExport>,
    /// Member concepts.
    pub concepts: Vec<ConceptExport>,
}

/// Exported cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterExport {
    /// Component label id.
    pub label: u64,
    /// Band key (tribe root ids).
    pub band: Vec<u64>,
    /// Root concept ids.
    pub roots: Vec<u64>,
    /// Member concepts.
    pub concepts: Vec<ConceptExport>,
}

/// Exported target group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetGroupExport {
    /// Relationship type id.
    pub rel_type: u64,
    /// Relationship type label.
    pub rel_type_name: String,
    /// Group label id.
    pub label: u64,
    /// Source concepts.
    pub sources: Vec<ConceptExport>,
    /// Target concepts.
    pub targets: Vec<ConceptExport>,
}

/// A complete label-resolved export of one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkExport {
    /// Edge set name ("asserted" or "inferred").
    pub mode: String,
    /// All areas.
    pub areas: Vec<AreaExport>,
    /// All partial areas.
    pub pareas: Vec<PareaExport>,
    /// All disjoint partial-areas.
    pub disjoint_pareas: Vec<DisjointExport>,
    /// All bands.
    pub bands: Vec<BandExport>,
    /// All clusters.
    pub clusters: Vec<ClusterExport>,
    /// All disjoint clusters.
    pub disjoint_clusters: Vec<DisjointExport>,
    /// All target groups.
    pub target_groups: Vec<TargetGroupExport>,
}

fn concept_export(graph: &ConceptGraph, id: crate::concept::ConceptId) -> ConceptExport {
    ConceptExport {
        id: id.get(),
        label: graph.label(id),
    }
}

/// Resolve a snapshot's ids against the graph's labels.
pub fn export_network(graph: &ConceptGraph, snapshot: &NetworkSnapshot) -> NetworkExport {
    let signature_name = |types: &[crate::concept::RelTypeId]| {
        crate::abn::signature::Signature::from_types(types.iter().copied()).display_name(graph)
    };

    NetworkExport {
        mode: snapshot.mode.to_string(),
        areas: snapshot
            .areas
            .iter()
            .map(|a| AreaExport {
                name: signature_name(&a.signature),
                signature: a.signature.iter().map(|t| t.get()).collect(),
                concepts: a.concepts.iter().map(|&c| concept_export(graph, c)).collect(),
            })
            .collect(),
        pareas: snapshot
            .pareas
            .iter()
            .map(|p| PareaExport {
                label: p.label.get(),
                label_name: graph.label(p.label),
                signature: p.signature.iter().map(|t| t.get()).collect(),
                roots: p.roots.iter().map(|r| r.get()).collect(),
                concepts: p.concepts.iter().map(|&c| concept_export(graph, c)).collect(),
                parents: p.parents.iter().map(|l| l.get()).collect(),
            })
            .collect(),
        disjoint_pareas: snapshot
            .disjoint_pareas
            .iter()
            .map(|u| DisjointExport {
                key: u.key.iter().map(|l| l.get()).collect(),
                concepts: u.concepts.iter().map(|&c| concept_export(graph, c)).collect(),
            })
            .collect(),
        bands: snapshot
            .bands
            .iter()
            .map(|b| BandExport {
                tribes: b.tribes.iter().map(|&t| concept_export(graph, t)).collect(),
                concepts: b.concepts.iter().map(|&c| concept_export(graph, c)).collect(),
            })
            .collect(),
        clusters: snapshot
            .clusters
            .iter()
            .map(|c| ClusterExport {
                label: c.label.get(),
                band: c.band.iter().map(|t| t.get()).collect(),
                roots: c.roots.iter().map(|r| r.get()).collect(),
                concepts: c.concepts.iter().map(|&m| concept_export(graph, m)).collect(),
            })
            .collect(),
        disjoint_clusters: snapshot
            .disjoint_clusters
            .iter()
            .map(|u| DisjointExport {
                key: u.key.iter().map(|l| l.get()).collect(),
                concepts: u.concepts.iter().map(|&c| concept_export(graph, c)).collect(),
            })
            .collect(),
        target_groups: snapshot
            .target_groups
            .iter()
            .map(|g| TargetGroupExport {
                rel_type: g.rel_type.get(),
                rel_type_name: graph.rel_label(g.rel_type),
                label: g.label.get(),
                sources: g.sources.iter().map(|&s| concept_export(graph, s)).collect(),
                targets: g.targets.iter().map(|&t| concept_export(graph, t)).collect(),
            })
            .collect(),
    }
}

/// Serialize an export to a pretty-printed JSON string.
pub fn to_json_string(export: &NetworkExport) -> Result<String, ExportError> {
    serde_json::to_string_pretty(export).map_err(|e| ExportError::Serialize {
        message: e.to_string(),
    })
}

/// Write an export as JSON to any writer.
pub fn write_json<W: Write>(export: &NetworkExport, mut writer: W) -> Result<(), ExportError> {
    let json = to_json_string(export)?;
    writer
        .write_all(json.as_bytes())
        .map_err(|source| ExportError::Io { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::{ConceptId, ConceptMeta, RelTypeId};
    use crate::graph::{EdgeMode, RelEdge};
    use crate::live::{IncrementalUpdater, UpdaterConfig};

    fn cid(id: u64) -> ConceptId {
        ConceptId::new(id).unwrap()
    }

    fn rid(id: u64) -> RelTypeId {
        RelTypeId::new(id).unwrap()
    }

    fn session() -> IncrementalUpdater {
        let g = ConceptGraph::new();
        for (id, label) in [(1, "finding"), (2, "disease"), (3, "site")] {
            g.add_concept(ConceptMeta::new(cid(id), label)).unwrap();
        }
        g.register_rel_type(rid(9), "finding-site");
        g.add_is_a(EdgeMode::Asserted, cid(2), cid(1)).unwrap();
        g.add_relationship(EdgeMode::Asserted, RelEdge::new(cid(2), rid(9), cid(3)))
            .unwrap();
        IncrementalUpdater::new(g, UpdaterConfig::default()).unwrap()
    }

    #[test]
    fn export_resolves_labels() {
        let updater = session();
        let export = export_network(updater.graph(), &updater.snapshot());

        assert_eq!(export.mode, "asserted");
        let named = export
            .areas
            .iter()
            .find(|a| a.name == "finding-site")
            .unwrap();
        assert_eq!(named.concepts.len(), 1);
        assert_eq!(named.concepts[0].label, "disease");
    }

    #[test]
    fn export_round_trips_through_json() {
        let updater = session();
        let export = export_network(updater.graph(), &updater.snapshot());
        let json = to_json_string(&export).unwrap();
        let back: NetworkExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.areas.len(), export.areas.len());
        assert_eq!(back.pareas.len(), export.pareas.len());
    }

    #[test]
    fn write_json_to_disk() {
        let updater = session();
        let export = export_network(updater.graph(), &updater.snapshot());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        let file = std::fs::File::create(&path).unwrap();
        write_json(&export, file).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("finding-site"));
    }
}
