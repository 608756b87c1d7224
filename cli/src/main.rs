use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use morphgen_core::{generate, GenerateRequest, SchemaRef, Universe};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "morphgen")]
#[command(about = "Generate conversions between two record schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate conversions from a primary record to a secondary record and back
    Generate {
        /// Namespace snapshot (JSON) describing both records
        snapshot: PathBuf,

        /// Primary record, <namespace-path>:<TypeName>
        primary: SchemaRef,

        /// Secondary record, <namespace-path>:<TypeName>
        secondary: SchemaRef,

        /// Generate the forward conversion as a method with this name
        #[arg(short, long)]
        method: Option<String>,

        /// Primary field left to the manual conversion hooks (repeatable)
        #[arg(short = 'x', long)]
        exclude: Vec<String>,

        /// Import path of a structured-error package
        #[arg(short, long)]
        errors: Option<String>,

        /// Match a primary field with a differently named secondary field,
        /// PRIMARY=SECONDARY (repeatable)
        #[arg(long = "override", value_parser = parse_override)]
        overrides: Vec<(String, String)>,

        /// Directory to write the generated file to (defaults to the primary
        /// record's directory under --root)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Root the snapshot's file names are relative to
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Print the generated source to stdout instead of writing it
        #[arg(long)]
        dry_run: bool,

        /// Print the resolved field correspondence as JSON to stdout
        #[arg(long)]
        report: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn parse_override(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((primary, secondary)) if !primary.is_empty() && !secondary.is_empty() => {
            Ok((primary.to_string(), secondary.to_string()))
        }
        _ => Err(format!("expected PRIMARY=SECONDARY, got '{value}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for --dry-run and --report
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            snapshot,
            primary,
            secondary,
            method,
            exclude,
            errors,
            overrides,
            output_dir,
            root,
            dry_run,
            report,
            format,
        } => {
            let content = fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to open snapshot file: {}", snapshot.display()))?;
            let universe = Universe::from_json(&content).map_err(|e| {
                anyhow::Error::from(e)
                    .context(format!("Failed to load snapshot from: {}", snapshot.display()))
            })?;

            // All fields set explicitly; clippy enforces exhaustiveness
            let request = GenerateRequest {
                primary,
                secondary,
                method,
                exclude,
                structured_errors: errors,
                overrides: overrides.into_iter().collect::<BTreeMap<_, _>>(),
            };

            let generation = generate(&universe, &request)
                .map_err(|e| anyhow::Error::from(e).context("Generation failed"))?;

            if report {
                let document = serde_json::json!({
                    "request": request,
                    "report": generation.report,
                });
                write_json(&document, format)?;
            }

            if dry_run {
                let source = morphgen_render::render_source(&generation.synthesis)?;
                let mut out = io::stdout().lock();
                out.write_all(source.as_bytes())
                    .context("Failed to write generated source")?;
                return Ok(());
            }

            let path = match output_dir {
                Some(dir) => dir.join(morphgen_render::output_file_name(
                    &generation.synthesis.source_file,
                )?),
                None => morphgen_render::output_path(&root, &generation.synthesis.source_file)?,
            };
            morphgen_render::write_to(&path, &generation.synthesis)?;
            tracing::info!(path = %path.display(), "conversions written");
        }
    }

    Ok(())
}

fn write_json<T: serde::Serialize>(val: &T, format: OutputFormat) -> Result<()> {
    let mut writer = BufWriter::new(io::stdout());

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush JSON output")?;

    Ok(())
}
