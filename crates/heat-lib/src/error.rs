//! Error types for the heat engine
//!
//! Every failure here is fatal to the invocation that raised it. The caller
//! (usually the evaluation loop) decides whether to skip the epoch or surface
//! the failure as a health signal.

use thiserror::Error;

/// Result type alias for heat engine operations
pub type Result<T> = std::result::Result<T, HeatError>;

/// Main error type for the heat engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeatError {
    /// A dataset does not have the fixed shape its consumer expects
    #[error("Structural validation failed for {dataset}: {reason}")]
    StructuralValidation { dataset: String, reason: String },

    /// A raw cell could not be read as the expected type
    #[error("Cannot parse {raw:?} in {dataset}.{column} as {expected}")]
    ValueFormat {
        dataset: String,
        column: String,
        raw: String,
        expected: &'static str,
    },

    /// Normalized values live in [0, 10]
    #[error("Normalized value {0} is outside [0, 10]")]
    OutOfRange(f64),

    /// A summary row disagrees with its declared schema
    #[error("Schema mismatch for table {table}: {reason}")]
    SchemaMismatch { table: String, reason: String },

    /// Wire bytes could not be decoded
    #[error("Decoding error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A summary message arrived without any summary set
    #[error("Summary message carries no summary")]
    EmptySummary,

    /// An enum tag on the wire is not one we know
    #[error("Unknown {kind} tag: {tag}")]
    UnknownTag { kind: &'static str, tag: i32 },
}

impl HeatError {
    pub(crate) fn structural(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        HeatError::StructuralValidation {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for the errors caused by malformed input datasets
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HeatError::StructuralValidation { .. }
                | HeatError::ValueFormat { .. }
                | HeatError::OutOfRange(_)
        )
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            HeatError::StructuralValidation { .. } => "structural_validation",
            HeatError::ValueFormat { .. } => "value_format",
            HeatError::OutOfRange(_) => "out_of_range",
            HeatError::SchemaMismatch { .. } => "schema_mismatch",
            HeatError::Decode(_) => "decode",
            HeatError::EmptySummary => "empty_summary",
            HeatError::UnknownTag { .. } => "unknown_tag",
        }
    }
}
