//! # ontoscope
//!
//! Structural summaries ("abstraction networks") of large concept
//! hierarchies. Given a directed graph of concepts connected by is-a edges
//! and typed defining-relationship edges, ontoscope groups concepts into
//! disjoint classification units and keeps the summary current as the
//! underlying ontology is edited.
//!
//! ## Architecture
//!
//! - **Concept graph** (`graph`): petgraph-backed dual edge sets
//!   (asserted + inferred), referentially checked mutations
//! - **Abstraction networks** (`abn`): areas, partial areas, disjoint
//!   partial areas, tribal bands/clusters, target groups
//! - **Live maintenance** (`live`): ordered edit stream, affected-set
//!   recomputation, baseline diffing
//! - **Export** (`export`): label-resolved JSON for persistence collaborators
//!
//! ## Library usage
//!
//! ```no_run
//! use ontoscope::concept::{ConceptId, ConceptMeta, RelTypeId};
//! use ontoscope::graph::{ConceptGraph, EdgeMode, RelEdge};
//! use ontoscope::live::{IncrementalUpdater, UpdaterConfig};
//!
//! let graph = ConceptGraph::new();
//! let body = ConceptId::new(1).unwrap();
//! let organ = ConceptId::new(2).unwrap();
//! let part_of = RelTypeId::new(10).unwrap();
//! graph.add_concept(ConceptMeta::new(body, "Body")).unwrap();
//! graph.add_concept(ConceptMeta::new(organ, "Organ")).unwrap();
//! graph.add_relationship(EdgeMode::Asserted, RelEdge::new(organ, part_of, body)).unwrap();
//!
//! let updater = IncrementalUpdater::new(graph, UpdaterConfig::default()).unwrap();
//! let snapshot = updater.snapshot();
//! assert_eq!(snapshot.areas.len(), 2);
//! ```

pub mod abn;
pub mod concept;
pub mod error;
pub mod export;
pub mod graph;
pub mod live;
