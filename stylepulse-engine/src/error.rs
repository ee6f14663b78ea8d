//! Engine error types.
//!
//! Every failure mode has a named variant. Row-level problems are not errors:
//! they are reported as `IngestWarning`s and never stop processing.

use thiserror::Error;

use crate::normalizer::{CanonicalField, SourceKind};

/// A whole file could not be ingested. Aborts that file only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestionFailure {
    #[error("{kind} input contains no rows")]
    EmptyInput { kind: SourceKind },

    #[error(
        "{kind} input has no column for {field} (best candidate {best_header:?} scored {best_score:.2}, need {threshold:.2})"
    )]
    UnmappedField {
        kind: SourceKind,
        field: CanonicalField,
        best_header: Option<String>,
        best_score: f64,
        threshold: f64,
    },

    #[error("{kind} input has no usable rows ({excluded} of {seen} excluded)")]
    NoUsableRows {
        kind: SourceKind,
        seen: usize,
        excluded: usize,
    },
}

impl IngestionFailure {
    /// The input file this failure blocks.
    pub fn kind(&self) -> SourceKind {
        match self {
            IngestionFailure::EmptyInput { kind }
            | IngestionFailure::UnmappedField { kind, .. }
            | IngestionFailure::NoUsableRows { kind, .. } => *kind,
        }
    }
}

/// An externally supplied parameter value was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// An internal invariant was violated. Never user-facing under a correct
/// implementation; surfaced instead of producing silently wrong numbers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Computation inconsistency: {0}")]
pub struct ComputationInconsistency(pub String);

/// Top-level error for a computation pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Ingestion(#[from] IngestionFailure),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Inconsistency(#[from] ComputationInconsistency),
}
