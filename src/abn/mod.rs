//! Abstraction networks: structural summaries of a concept graph.
//!
//! Each submodule derives one classification layer from the
//! [`ConceptGraph`](crate::graph::ConceptGraph); all of them are memoized
//! pure functions of graph state and regenerate deterministically:
//!
//! - [`signature`]: relationship signatures and areas
//! - [`partition`]: shared connected-component and disjoint-unit machinery
//! - [`parea`]: partial areas, the partial-area child-of taxonomy, and
//!   disjoint partial areas
//! - [`tan`]: tribal bands, clusters, and disjoint clusters
//! - [`target`]: target groups keyed by incoming source-sets

pub mod parea;
pub mod partition;
pub mod signature;
pub mod tan;
pub mod target;
