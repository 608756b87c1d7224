//! Configuration for a generation run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaRef;

/// A single generation request.
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `structured-errors`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerateRequest {
    /// Record the conversions are generated next to.
    pub primary: SchemaRef,
    /// Record converted to and from.
    pub secondary: SchemaRef,
    /// Method name for the forward conversion. A free function named after
    /// both records is generated when absent.
    pub method: Option<String>,
    /// Primary field names that are never converted automatically. Both
    /// generated procedures defer them to the manual completion hooks.
    pub exclude: Vec<String>,
    /// Import path of a structured-error package. Standard `errors`/`fmt`
    /// errors are generated when absent.
    pub structured_errors: Option<String>,
    /// Manual field-name overrides, primary name to secondary name. Never
    /// grown by the engine.
    pub overrides: BTreeMap<String, String>,
}

impl GenerateRequest {
    pub fn new(primary: SchemaRef, secondary: SchemaRef) -> Self {
        Self {
            primary,
            secondary,
            ..Self::default()
        }
    }

    pub fn is_excluded(&self, primary_field: &str) -> bool {
        self.exclude.iter().any(|name| name == primary_field)
    }
}
