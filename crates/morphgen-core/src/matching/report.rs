//! Matching report: a log-friendly and JSON-friendly view of a
//! [`Correspondence`].

use serde::Serialize;

use crate::description::MatchDescription;
use crate::types::Universe;

use super::Correspondence;

#[derive(Debug, Clone, Serialize)]
pub struct MatchingReport {
    pub primary: String,
    pub secondary: String,
    pub fields: Vec<FieldEntry>,
    pub unions: Vec<UnionEntry>,
    pub uncovered: Vec<String>,
    pub primary_mismatch: bool,
    pub secondary_mismatch: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldEntry {
    pub primary: String,
    pub primary_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_type: Option<String>,
    pub excluded: bool,
    pub summary: String,
    pub description: MatchDescription,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnionEntry {
    pub field: String,
    pub branches: Vec<BranchEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchEntry {
    pub branch: String,
    pub payload_type: String,
    pub primary: String,
    pub primary_type: String,
    pub summary: String,
}

impl Correspondence {
    pub fn report(&self, universe: &Universe) -> MatchingReport {
        let fields = self
            .fields
            .iter()
            .map(|m| FieldEntry {
                primary: m.primary.name.clone(),
                primary_type: universe.display(m.primary.ty).to_string(),
                secondary: m.secondary.as_ref().map(|s| s.name.clone()),
                secondary_type: m
                    .secondary
                    .as_ref()
                    .map(|s| universe.display(s.ty).to_string()),
                excluded: m.excluded,
                summary: m.description.to_string(),
                description: m.description.clone(),
            })
            .collect();

        let unions = self
            .unions
            .iter()
            .map(|u| UnionEntry {
                field: u.secondary.name.clone(),
                branches: u
                    .branches
                    .iter()
                    .map(|b| BranchEntry {
                        branch: b.type_name.clone(),
                        payload_type: universe.display(b.payload.ty).to_string(),
                        primary: b.primary.name.clone(),
                        primary_type: universe.display(b.primary.ty).to_string(),
                        summary: b.description.to_string(),
                    })
                    .collect(),
            })
            .collect();

        MatchingReport {
            primary: universe.display(self.primary.ty).to_string(),
            secondary: universe.display(self.secondary.ty).to_string(),
            fields,
            unions,
            uncovered: self.uncovered.iter().map(|f| f.name.clone()).collect(),
            primary_mismatch: self.primary_mismatch(),
            secondary_mismatch: self.secondary_mismatch(),
        }
    }
}

impl MatchingReport {
    /// Emit the report through `tracing`.
    pub fn log(&self) {
        tracing::info!(
            primary = %self.primary,
            secondary = %self.secondary,
            "regular fields matches"
        );
        for entry in &self.fields {
            match (&entry.secondary, &entry.secondary_type) {
                (Some(secondary), Some(secondary_type)) => tracing::info!(
                    "primary {}({}) ↔ secondary {}({}): {}{}",
                    entry.primary,
                    entry.primary_type,
                    secondary,
                    secondary_type,
                    entry.summary,
                    if entry.excluded { " (excluded)" } else { "" }
                ),
                _ => tracing::warn!(
                    "primary field {} ({}): {}",
                    entry.primary,
                    entry.primary_type,
                    entry.summary
                ),
            }
        }

        for union in &self.unions {
            for branch in &union.branches {
                tracing::info!(
                    "primary field {} ({}) ↔ secondary union branch {} ({}) of {}: {}",
                    branch.primary,
                    branch.primary_type,
                    branch.branch,
                    branch.payload_type,
                    union.field,
                    branch.summary
                );
            }
        }

        if self.primary_mismatch {
            tracing::warn!("not all primary fields were matched");
        }
        if self.secondary_mismatch {
            tracing::warn!(uncovered = ?self.uncovered, "not all secondary fields were matched");
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
