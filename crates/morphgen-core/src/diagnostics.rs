//! Diagnostics collected while matching fields.
//!
//! The matching pass never stops at the first problem: every violation is
//! pushed into a [`Diagnostics`] collector that the caller owns and threads
//! through explicitly, and generation aborts only once the whole schema has
//! been inspected.

use std::fmt;

use serde::Serialize;

use crate::types::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic tied to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Field (or other declaration) the diagnostic is about.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(position) = &self.position {
            write!(f, "{position} ")?;
        }
        write!(f, "{}: {}", self.subject, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(
        &mut self,
        position: Option<Position>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Error, position, subject.into(), message.into());
    }

    pub fn warning(
        &mut self,
        position: Option<Position>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Warning, position, subject.into(), message.into());
    }

    fn push(
        &mut self,
        severity: Severity,
        position: Option<Position>,
        subject: String,
        message: String,
    ) {
        self.items.push(Diagnostic {
            severity,
            position,
            subject,
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the collector, keeping only error diagnostics.
    pub fn into_errors(self) -> Vec<Diagnostic> {
        self.items
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }
}
