//! Error construction in generated code.

use super::writer::Imports;

/// How generated code builds its errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorStyle {
    /// `errors.New` and `fmt.Errorf` from the standard library.
    Standard,
    /// A structured-error package exposing `New`, `Newf`, `Wrap`, `Wrapf`
    /// and an error type with an `Any(key, value)` tagging method.
    Structured { path: String, name: String },
}

impl ErrorStyle {
    pub fn structured(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        ErrorStyle::Structured { path, name }
    }

    /// Error with a fixed message.
    pub fn plain(&self, imports: &mut Imports, message: &str) -> String {
        match self {
            ErrorStyle::Standard => {
                let errors = imports.add("errors", "errors");
                format!("{errors}.New({})", quote(message))
            }
            ErrorStyle::Structured { path, name } => {
                let alias = imports.add(path, name);
                format!("{alias}.New({})", quote(message))
            }
        }
    }

    /// Error from a format string and its arguments.
    pub fn formatted(&self, imports: &mut Imports, format: &str, args: &[&str]) -> String {
        let args = join_args(args);
        match self {
            ErrorStyle::Standard => {
                let fmt = imports.add("fmt", "fmt");
                format!("{fmt}.Errorf({}{args})", quote(format))
            }
            ErrorStyle::Structured { path, name } => {
                let alias = imports.add(path, name);
                format!("{alias}.Newf({}{args})", quote(format))
            }
        }
    }

    /// `err` wrapped with a fixed context message.
    pub fn wrap(&self, imports: &mut Imports, err: &str, message: &str) -> String {
        match self {
            ErrorStyle::Standard => {
                let fmt = imports.add("fmt", "fmt");
                format!("{fmt}.Errorf({}, {err})", quote(&format!("{message}: %w")))
            }
            ErrorStyle::Structured { path, name } => {
                let alias = imports.add(path, name);
                format!("{alias}.Wrap({err}, {})", quote(message))
            }
        }
    }

    /// `err` wrapped with a formatted context message.
    pub fn wrapf(&self, imports: &mut Imports, err: &str, format: &str, args: &[&str]) -> String {
        match self {
            ErrorStyle::Standard => {
                let fmt = imports.add("fmt", "fmt");
                format!(
                    "{fmt}.Errorf({}{}, {err})",
                    quote(&format!("{format}: %w")),
                    join_args(args)
                )
            }
            ErrorStyle::Structured { path, name } => {
                let alias = imports.add(path, name);
                format!("{alias}.Wrapf({err}, {}{})", quote(format), join_args(args))
            }
        }
    }

    /// Attach `key = value` to an error expression. Standard errors carry no
    /// tags.
    pub fn tagged(&self, expr: String, key: &str, value: &str) -> String {
        match self {
            ErrorStyle::Standard => expr,
            ErrorStyle::Structured { .. } => format!("{expr}.Any({}, {value})", quote(key)),
        }
    }
}

fn join_args(args: &[&str]) -> String {
    args.iter().map(|a| format!(", {a}")).collect()
}

/// Double-quoted string literal.
pub(crate) fn quote(text: &str) -> String {
    format!("{text:?}")
}
