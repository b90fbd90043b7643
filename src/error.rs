//! Rich diagnostic error types for the ontoscope engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. No error is silently
//! swallowed: structural errors abort the single mutating operation that
//! raised them, with no partial mutation observable.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the ontoscope engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OntoError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Concept(#[from] ConceptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tan(#[from] TanError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// Concept errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConceptError {
    #[error("id allocator exhausted: cannot allocate more than u64::MAX ids")]
    #[diagnostic(
        code(onto::concept::exhausted),
        help(
            "The id space is exhausted. This is extremely unlikely in practice \
             (requires 2^64 allocations) — check for id allocation loops."
        )
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("unknown concept: {concept}")]
    #[diagnostic(
        code(onto::graph::unknown_concept),
        help(
            "The operation references a concept id that is not in the graph. \
             Add the concept first, or check that the loader supplied it."
        )
    )]
    UnknownConcept { concept: u64 },

    #[error("duplicate concept: {concept}")]
    #[diagnostic(
        code(onto::graph::duplicate_concept),
        help("A concept with this id already exists. Concept ids must be unique.")
    )]
    DuplicateConcept { concept: u64 },

    #[error("duplicate is-a edge: {child} -> {parent}")]
    #[diagnostic(
        code(onto::graph::duplicate_is_a),
        help("This is-a edge already exists in the selected edge set.")
    )]
    DuplicateIsA { child: u64, parent: u64 },

    #[error("duplicate relationship edge: {src} -[{rel_type}]-> {target}")]
    #[diagnostic(
        code(onto::graph::duplicate_relationship),
        help("This defining-relationship edge already exists in the selected edge set.")
    )]
    DuplicateRelationship {
        src: u64,
        rel_type: u64,
        target: u64,
    },

    #[error("missing is-a edge: {child} -> {parent}")]
    #[diagnostic(
        code(onto::graph::missing_is_a),
        help("The is-a edge to remove does not exist in the selected edge set.")
    )]
    MissingIsA { child: u64, parent: u64 },

    #[error("missing relationship edge: {src} -[{rel_type}]-> {target}")]
    #[diagnostic(
        code(onto::graph::missing_relationship),
        help("The relationship edge to remove does not exist in the selected edge set.")
    )]
    MissingRelationship {
        src: u64,
        rel_type: u64,
        target: u64,
    },
}

// ---------------------------------------------------------------------------
// Tribal-network configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TanError {
    #[error("tribe root set is empty")]
    #[diagnostic(
        code(onto::tan::empty_tribes),
        help("A tribal abstraction network needs at least one root concept.")
    )]
    EmptyTribes,

    #[error("tribe root references unknown concept: {concept}")]
    #[diagnostic(
        code(onto::tan::unknown_root),
        help("Every tribe root must be a concept present in the graph.")
    )]
    UnknownRoot { concept: u64 },
}

// ---------------------------------------------------------------------------
// Live-update errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum UpdateError {
    #[error("edit could not be applied: {op}")]
    #[diagnostic(
        code(onto::live::apply),
        help(
            "The edit operation failed its structural validation and was not \
             applied. Graph state and all classification caches are unchanged."
        )
    )]
    Apply {
        /// Description of the rejected edit operation.
        op: String,
        #[source]
        source: GraphError,
    },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("serialization error: {message}")]
    #[diagnostic(
        code(onto::export::serde),
        help("Failed to serialize the network snapshot. This is a bug — please report it.")
    )]
    Serialize { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(onto::export::io),
        help("Writing the export stream failed. Check the destination and permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning ontoscope results.
pub type OntoResult<T> = std::result::Result<T, OntoError>;
