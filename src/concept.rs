//! Core identifier types for the ontoscope engine.
//!
//! Concepts and relationship types are identified by stable, ontology-scoped
//! ids. Every classification structure (areas, partial areas, bands, target
//! groups) holds non-owning [`ConceptId`] references back into the
//! [`ConceptGraph`](crate::graph::ConceptGraph), which owns the concepts
//! themselves. The [`IdAllocator`] provides thread-safe id generation for
//! programmatic graph construction.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ConceptError, OntoResult};

/// Unique, niche-optimized identifier for a concept.
///
/// Uses `NonZeroU64` so that `Option<ConceptId>` is the same size as
/// `ConceptId`. The `Ord` impl (plain numeric order) is the tie-break rule
/// everywhere a deterministic label is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConceptId(NonZeroU64);

impl ConceptId {
    /// Create a `ConceptId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ConceptId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c:{}", self.0)
    }
}

/// Identifier for a defining-relationship type (e.g. "finding site").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RelTypeId(NonZeroU64);

impl RelTypeId {
    /// Create a `RelTypeId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(RelTypeId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for RelTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r:{}", self.0)
    }
}

/// Metadata describing a concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptMeta {
    /// Unique identifier.
    pub id: ConceptId,
    /// Human-readable label, used for display and export only.
    pub label: String,
}

impl ConceptMeta {
    /// Create metadata for a concept.
    pub fn new(id: ConceptId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Thread-safe id allocator for building ontologies programmatically.
///
/// Produces monotonically increasing ids starting from 1. Loaders that carry
/// their own stable identifiers bypass this entirely.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create a new allocator that starts from id 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Create an allocator that resumes from a given id.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    /// Allocate the next concept id.
    pub fn next_concept(&self) -> OntoResult<ConceptId> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        ConceptId::new(raw).ok_or_else(|| ConceptError::AllocatorExhausted.into())
    }

    /// Allocate the next relationship-type id.
    ///
    /// Concept and relationship-type ids share one counter, so an id never
    /// names both a concept and a type.
    pub fn next_rel_type(&self) -> OntoResult<RelTypeId> {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        RelTypeId::new(raw).ok_or_else(|| ConceptError::AllocatorExhausted.into())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
