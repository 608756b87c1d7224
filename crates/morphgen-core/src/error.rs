//! Error types for correspondence resolution and conversion synthesis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Stable, machine-readable error codes.
///
/// Variant names and their serialized `snake_case` strings are part of the
/// CLI's `--report` contract and must not change across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// The snapshot document is not valid JSON or has the wrong shape.
    SnapshotParseError,
    /// The snapshot references an unknown type or is internally inconsistent.
    SnapshotError,
    /// A `<namespace>:<TypeName>` reference is malformed.
    InvalidSchemaRef,
    /// The requested namespace or type is absent.
    SchemaNotFound,
    /// The requested type exists but is not a record.
    NotARecord,
    /// One or more fields have types conversions cannot be generated for.
    UnsupportedFieldType,
    /// Internal invariant violation while synthesizing conversions.
    ConversionSynthesisFailure,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("snapshot decoding error: {0}")]
    SnapshotJson(#[from] serde_json::Error),

    #[error("snapshot error in {namespace}: {message}")]
    Snapshot { namespace: String, message: String },

    #[error("invalid schema reference '{0}', <namespace-path>:<TypeName> required")]
    InvalidSchemaRef(String),

    #[error("schema not found: {reference}")]
    SchemaNotFound { reference: String },

    #[error("{reference} is not a record type")]
    NotARecord { reference: String },

    #[error(
        "unhandled field types met, cannot continue:\n{}",
        render_diagnostics(.diagnostics)
    )]
    UnsupportedFieldTypes { diagnostics: Vec<Diagnostic> },

    #[error("conversion synthesis failure: {message}")]
    ConversionSynthesisFailure { message: String },
}

impl GenerateError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            GenerateError::SnapshotJson(_) => ErrorCode::SnapshotParseError,
            GenerateError::Snapshot { .. } => ErrorCode::SnapshotError,
            GenerateError::InvalidSchemaRef(_) => ErrorCode::InvalidSchemaRef,
            GenerateError::SchemaNotFound { .. } => ErrorCode::SchemaNotFound,
            GenerateError::NotARecord { .. } => ErrorCode::NotARecord,
            GenerateError::UnsupportedFieldTypes { .. } => ErrorCode::UnsupportedFieldType,
            GenerateError::ConversionSynthesisFailure { .. } => {
                ErrorCode::ConversionSynthesisFailure
            }
        }
    }

    /// Diagnostics attached to the error, empty for every variant except
    /// [`GenerateError::UnsupportedFieldTypes`].
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            GenerateError::UnsupportedFieldTypes { diagnostics } => diagnostics,
            _ => &[],
        }
    }

    /// Produces a structured JSON error.
    ///
    /// Format: `{"code": "...", "message": "...", "diagnostics": [...]}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "diagnostics": self.diagnostics(),
        })
    }

    pub(crate) fn synthesis(message: impl Into<String>) -> Self {
        GenerateError::ConversionSynthesisFailure {
            message: message.into(),
        }
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}
