//! # morphgen-core
//!
//! Resolve a field-level correspondence between two record schemas and
//! synthesize conversion procedures in both directions.
//!
//! The pipeline runs once per request:
//!
//! 1. **Load**: a JSON namespace snapshot becomes a [`Universe`].
//! 2. **Resolve**: the [`Resolver`] decides, per field type pair, whether and
//!    how one type converts into the other.
//! 3. **Match**: primary fields are aligned with secondary fields, then
//!    secondary union fields claim what remained unmatched.
//! 4. **Synthesize**: both procedures are emitted as indented statements plus
//!    import requests. Rendering them into a file is `morphgen-render`'s job.

pub mod config;
pub mod conversion;
pub mod description;
pub mod diagnostics;
pub mod enums;
pub mod error;
pub mod matching;
pub mod naming;
pub mod resolver;
pub mod schema;
pub mod snapshot;
pub mod synth;
pub mod types;

pub use config::GenerateRequest;
pub use description::MatchDescription;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ErrorCode, GenerateError};
pub use matching::{Correspondence, MatchingReport};
pub use resolver::Resolver;
pub use schema::{RecordSchema, SchemaRef};
pub use synth::{ErrorStyle, Import, Line, Synthesis};
pub use types::{TypeId, Universe};

/// Everything a generation run produced.
#[derive(Debug, Clone)]
pub struct Generation {
    pub correspondence: Correspondence,
    pub report: MatchingReport,
    pub synthesis: Synthesis,
    /// Non-fatal findings: unmatched and uncovered fields.
    pub diagnostics: Diagnostics,
}

/// Run the whole pipeline for `request` against `universe`.
pub fn generate(universe: &Universe, request: &GenerateRequest) -> Result<Generation, GenerateError> {
    let primary = universe.record(&request.primary)?;
    let secondary = universe.record(&request.secondary)?;
    tracing::debug!(
        primary = %request.primary,
        secondary = %request.secondary,
        "generating conversions"
    );

    let mut resolver = Resolver::new(universe);
    let mut diagnostics = Diagnostics::new();
    let correspondence = matching::match_records(
        &mut resolver,
        &primary,
        &secondary,
        request,
        &mut diagnostics,
    )?;

    let report = correspondence.report(universe);
    report.log();
    for warning in diagnostics.warnings() {
        tracing::warn!("{warning}");
    }

    let synthesis = synth::synthesize(universe, &correspondence, request)?;
    Ok(Generation {
        correspondence,
        report,
        synthesis,
        diagnostics,
    })
}

/// Parse a snapshot document and run [`generate`] against it.
pub fn generate_from_json(snapshot: &str, request: &GenerateRequest) -> Result<Generation, GenerateError> {
    let universe = Universe::from_json(snapshot)?;
    generate(&universe, request)
}
