//! Source renderer for synthesized conversions.
//!
//! Turns a [`Synthesis`] (indented statements plus import requests) into a Go
//! source file through an embedded `tera` template, and writes it next to the
//! file declaring the primary record.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use morphgen_core::Synthesis;
use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by morphgen generate. DO NOT EDIT.";

/// Suffix appended to the primary file's stem to name the generated file.
pub const FILE_SUFFIX: &str = "_morphgen.go";

const TEMPLATE: &str = "go/conversion.go.tera";

#[derive(Embed)]
#[folder = "templates/"]
struct Templates;

/// Template context for one generated file.
#[derive(Serialize)]
struct FileContext<'a> {
    header: &'static str,
    package: &'a str,
    imports: Vec<ImportContext<'a>>,
    body: String,
}

#[derive(Serialize)]
struct ImportContext<'a> {
    path: &'a str,
    /// Empty when the package is referenced by its own name.
    alias: &'a str,
}

/// Build the tera engine from the embedded templates.
fn engine() -> Result<Tera> {
    let mut tera = Tera::default();
    for file_name in Templates::iter() {
        let file = Templates::get(&file_name)
            .with_context(|| format!("Failed to load embedded template: {}", file_name))?;
        let content = std::str::from_utf8(file.data.as_ref())
            .with_context(|| format!("Template {} is not valid UTF-8", file_name))?;
        tera.add_raw_template(&file_name, content)
            .with_context(|| format!("Failed to register template: {}", file_name))?;
    }
    Ok(tera)
}

/// Render the complete source text of a synthesized conversion file.
pub fn render_source(synthesis: &Synthesis) -> Result<String> {
    let tera = engine()?;
    let context = FileContext {
        header: HEADER,
        package: &synthesis.package,
        imports: synthesis
            .imports
            .iter()
            .map(|i| ImportContext {
                path: &i.path,
                alias: i.alias.as_deref().unwrap_or(""),
            })
            .collect(),
        body: synthesis.body_text().trim_end().to_string(),
    };
    let ctx = tera::Context::from_serialize(&context)?;
    tera.render(TEMPLATE, &ctx)
        .with_context(|| format!("Failed to render template: {}", TEMPLATE))
}

/// Name of the generated file for a primary record declared in
/// `source_file`: `user.go` gives `user_morphgen.go`.
pub fn output_file_name(source_file: &str) -> Result<String> {
    let stem = Path::new(source_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .with_context(|| {
            format!(
                "Cannot derive an output file name from '{}', the primary record has no source file",
                source_file
            )
        })?;
    Ok(format!("{stem}{FILE_SUFFIX}"))
}

/// Generated file path: the primary file's directory under `root`.
pub fn output_path(root: &Path, source_file: &str) -> Result<PathBuf> {
    let name = output_file_name(source_file)?;
    let dir = Path::new(source_file).parent().unwrap_or_else(|| Path::new(""));
    Ok(root.join(dir).join(name))
}

/// Render `synthesis` and write it to `path`, creating parent directories.
pub fn write_to(path: &Path, synthesis: &Synthesis) -> Result<()> {
    let rendered = render_source(synthesis)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("Failed to write: {}", path.display()))?;
    Ok(())
}

/// Render `synthesis` next to the primary record's file under `root` and
/// return the written path.
pub fn write(root: &Path, synthesis: &Synthesis) -> Result<PathBuf> {
    let path = output_path(root, &synthesis.source_file)?;
    write_to(&path, synthesis)?;
    Ok(path)
}
