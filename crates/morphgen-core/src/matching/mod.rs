//! Field correspondence between a primary and a secondary record.
//!
//! Ordinary fields are aligned first (see [`fields`]), then union fields of
//! the secondary record claim whatever remained unmatched (see [`union`]).
//! Unsupported field types are collected across the whole primary record
//! before the pass gives up.

pub mod fields;
pub mod report;
pub mod union;

use crate::config::GenerateRequest;
use crate::diagnostics::Diagnostics;
use crate::error::GenerateError;
use crate::resolver::Resolver;
use crate::schema::RecordSchema;
use crate::types::Field;

pub use fields::FieldMatch;
pub use report::MatchingReport;
pub use union::{Branch, UnionCorrespondence};

/// Resolved correspondence between two records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correspondence {
    pub primary: RecordSchema,
    pub secondary: RecordSchema,
    /// One entry per exported primary field not consumed by a union, in
    /// primary declaration order.
    pub fields: Vec<FieldMatch>,
    pub unions: Vec<UnionCorrespondence>,
    /// Exported secondary fields covered by neither a resolved match nor a
    /// union.
    pub uncovered: Vec<Field>,
}

impl Correspondence {
    /// Some primary field needs the manual completion hook.
    pub fn primary_mismatch(&self) -> bool {
        self.fields.iter().any(|m| !m.is_resolved())
    }

    /// Some secondary field needs the manual completion hook.
    pub fn secondary_mismatch(&self) -> bool {
        !self.uncovered.is_empty() || self.fields.iter().any(|m| m.excluded)
    }

    pub fn match_for_primary(&self, name: &str) -> Option<&FieldMatch> {
        self.fields.iter().find(|m| m.primary.name == name)
    }

    /// Resolved match converting into the secondary field `name`.
    pub fn match_for_secondary(&self, name: &str) -> Option<&FieldMatch> {
        self.fields.iter().find(|m| {
            m.is_resolved() && m.secondary.as_ref().is_some_and(|s| s.name == name)
        })
    }

    pub fn union_for_primary(&self, name: &str) -> Option<&UnionCorrespondence> {
        self.unions
            .iter()
            .find(|u| u.branch_for_primary(name).is_some())
    }

    pub fn union_for_secondary(&self, name: &str) -> Option<&UnionCorrespondence> {
        self.unions.iter().find(|u| u.secondary.name == name)
    }

    fn is_covered(&self, field: &Field) -> bool {
        self.match_for_secondary(&field.name).is_some()
            || self.union_for_secondary(&field.name).is_some()
    }
}

/// Match `primary` against `secondary`.
///
/// Fails with [`GenerateError::UnsupportedFieldTypes`] listing every
/// unsupported primary field. Unmatched primary fields and uncovered
/// secondary fields are reported as warnings in `diagnostics`.
pub fn match_records(
    resolver: &mut Resolver<'_>,
    primary: &RecordSchema,
    secondary: &RecordSchema,
    request: &GenerateRequest,
    diagnostics: &mut Diagnostics,
) -> Result<Correspondence, GenerateError> {
    let mut fields = fields::match_fields(resolver, primary, secondary, request, diagnostics);
    if diagnostics.has_errors() {
        return Err(GenerateError::UnsupportedFieldTypes {
            diagnostics: diagnostics.errors().cloned().collect(),
        });
    }

    let unions = union::match_unions(resolver, secondary, &mut fields, request)?;

    let mut correspondence = Correspondence {
        primary: primary.clone(),
        secondary: secondary.clone(),
        fields,
        unions,
        uncovered: Vec::new(),
    };
    correspondence.uncovered = secondary
        .exported_fields()
        .filter(|f| !correspondence.is_covered(f))
        .cloned()
        .collect();

    for m in &correspondence.fields {
        let position = Some(m.primary.position.clone());
        if m.excluded {
            diagnostics.warning(position, &m.primary.name, "excluded, manual conversion required");
        } else if !m.is_resolved() {
            diagnostics.warning(position, &m.primary.name, "no match, manual conversion required");
        }
    }
    for field in &correspondence.uncovered {
        diagnostics.warning(
            Some(field.position.clone()),
            &field.name,
            "secondary field is not covered",
        );
    }

    Ok(correspondence)
}
