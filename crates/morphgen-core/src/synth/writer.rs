//! Statement and import buffers filled by the synthesizer.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// One emitted source line. Indentation is kept apart from the text so the
/// renderer decides how to lay it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub indent: usize,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Writer {
    lines: Vec<Line>,
    depth: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            indent: self.depth,
            text: text.into(),
        });
    }

    pub fn blank(&mut self) {
        // Never two blank lines in a row, never one right after an opener.
        let after_opener = self.lines.last().map_or(true, |l| l.text.ends_with('{'));
        let after_blank = self.lines.last().is_some_and(|l| l.text.is_empty());
        if !after_opener && !after_blank {
            self.lines.push(Line {
                indent: 0,
                text: String::new(),
            });
        }
    }

    /// Line ending with `{`; following lines are nested one level deeper.
    pub fn open(&mut self, text: impl Into<String>) {
        self.line(text);
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// `} else {` style continuation.
    pub fn reopen(&mut self, text: impl Into<String>) {
        self.depth = self.depth.saturating_sub(1);
        self.open(text);
    }

    /// `case` label of the switch opened last.
    pub fn case(&mut self, label: impl Into<String>) {
        self.lines.push(Line {
            indent: self.depth.saturating_sub(1),
            text: label.into(),
        });
    }

    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }
}

/// A requested import. `alias` is set only when it differs from the package
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Deterministic, collision-free import aliases.
#[derive(Debug)]
pub struct Imports {
    entries: BTreeMap<String, (String, String)>,
    taken: HashSet<String>,
}

impl Imports {
    /// `reserved` names are never used as aliases (local identifiers of the
    /// generated code).
    pub fn new(reserved: &[&str]) -> Self {
        Self {
            entries: BTreeMap::new(),
            taken: reserved.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Request `path` (package name `name`) and return the alias to
    /// reference it by.
    pub fn add(&mut self, path: &str, name: &str) -> String {
        if let Some((_, alias)) = self.entries.get(path) {
            return alias.clone();
        }
        let mut alias = name.to_string();
        let mut n = 2;
        while self.taken.contains(&alias) {
            alias = format!("{name}{n}");
            n += 1;
        }
        self.taken.insert(alias.clone());
        self.entries
            .insert(path.to_string(), (name.to_string(), alias.clone()));
        alias
    }

    /// Requested imports sorted by path.
    pub fn into_list(self) -> Vec<Import> {
        self.entries
            .into_iter()
            .map(|(path, (name, alias))| Import {
                path,
                alias: (alias != name).then_some(alias),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nesting() {
        let mut w = Writer::new();
        w.open("switch v {");
        w.case("case 1:");
        w.line("a()");
        w.case("default:");
        w.open("if err != nil {");
        w.line("b()");
        w.reopen("} else {");
        w.line("c()");
        w.close();
        w.close();

        let shown: Vec<_> = w
            .into_lines()
            .into_iter()
            .map(|l| format!("{}{}", "\t".repeat(l.indent), l.text))
            .collect();
        assert_eq!(
            shown,
            vec![
                "switch v {",
                "case 1:",
                "\ta()",
                "default:",
                "\tif err != nil {",
                "\t\tb()",
                "\t} else {",
                "\t\tc()",
                "\t}",
                "}",
            ]
        );
    }

    #[test]
    fn test_blank_lines_are_collapsed() {
        let mut w = Writer::new();
        w.open("func f() {");
        w.blank();
        w.line("a()");
        w.blank();
        w.blank();
        w.line("b()");
        w.close();
        assert_eq!(w.into_lines().len(), 5);
    }

    #[test]
    fn test_import_aliases_are_collision_free() {
        let mut imports = Imports::new(&["x", "res"]);
        assert_eq!(imports.add("example.com/a/models", "models"), "models");
        assert_eq!(imports.add("example.com/b/models", "models"), "models2");
        assert_eq!(imports.add("example.com/a/models", "models"), "models");
        assert_eq!(imports.add("example.com/x", "x"), "x2");
        assert_eq!(imports.add("fmt", "fmt"), "fmt");

        assert_eq!(
            imports.into_list(),
            vec![
                Import { path: "example.com/a/models".into(), alias: None },
                Import { path: "example.com/b/models".into(), alias: Some("models2".into()) },
                Import { path: "example.com/x".into(), alias: Some("x2".into()) },
                Import { path: "fmt".into(), alias: None },
            ]
        );
    }
}
