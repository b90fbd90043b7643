//! Concept graph: dual edge-set graph of is-a and defining relationships.
//!
//! The graph stores concepts and two parallel, same-shaped edge sets:
//!
//! - **Asserted** edges, supplied by the ontology loader and mutated by the
//!   editing collaborator.
//! - **Inferred** edges, supplied wholesale by a reasoner collaborator.
//!
//! The two sets are never merged; every classification pass names the
//! [`EdgeMode`] it reads.

pub mod hierarchy;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::concept::{ConceptId, RelTypeId};

pub use store::ConceptGraph;

/// Which edge set a query or classification pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeMode {
    /// Edges asserted by the ontology author.
    Asserted,
    /// Edges supplied by a reasoner.
    Inferred,
}

impl std::fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeMode::Asserted => write!(f, "asserted"),
            EdgeMode::Inferred => write!(f, "inferred"),
        }
    }
}

/// Edge payload stored on graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Hierarchical child -> parent edge.
    IsA,
    /// Defining relationship of the given type, source -> target.
    Relationship(RelTypeId),
}

/// A defining-relationship edge, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelEdge {
    /// Concept instantiating the relationship.
    pub source: ConceptId,
    /// Relationship type.
    pub rel_type: RelTypeId,
    /// Concept the relationship points at.
    pub target: ConceptId,
}

impl RelEdge {
    /// Create a relationship edge record.
    pub fn new(source: ConceptId, rel_type: RelTypeId, target: ConceptId) -> Self {
        Self {
            source,
            rel_type,
            target,
        }
    }
}
