//! Snapshot loader.
//!
//! Builds a [`Universe`] from a JSON description of namespaces. Type
//! expressions use the target language's syntax (`*T`, `[]T`, `map[K]V`,
//! `chan T`, `func(...)`), with `path:Name` for references into other
//! namespaces. A reference into a namespace the snapshot does not describe
//! yields an opaque named type, which only ever matches itself.
//!
//! Loading runs in two phases: every named type is declared first, then
//! underlying types and signatures are resolved, so declarations may refer to
//! each other (and to themselves) in any order.

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;

use crate::error::GenerateError;
use crate::naming::is_exported;
use crate::types::{
    BasicKind, ConstValue, Constant, Field, NamespaceId, Position, Routine, TypeId, TypeKind,
    Universe, UnsupportedKind,
};

// ---------------------------------------------------------------------------
// Document shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub namespaces: Vec<NamespaceSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceSnapshot {
    pub path: String,
    /// Short name used to qualify references. Defaults to the last path
    /// segment.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
    #[serde(default)]
    pub constants: Vec<ConstantSnapshot>,
    #[serde(default)]
    pub variables: Vec<VariableSnapshot>,
    #[serde(default)]
    pub functions: Vec<RoutineSnapshot>,
}

/// A named type declaration. Exactly one of `fields`, `underlying` and
/// `interface` describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeSnapshot {
    pub name: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub fields: Option<Vec<FieldSnapshot>>,
    #[serde(default)]
    pub underlying: Option<String>,
    #[serde(default)]
    pub interface: Option<Vec<String>>,
    #[serde(default)]
    pub methods: Vec<RoutineSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: LiteralSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LiteralSnapshot {
    Int(i64),
    Uint(u64),
    Str(String),
}

impl From<&LiteralSnapshot> for ConstValue {
    fn from(value: &LiteralSnapshot) -> Self {
        match value {
            LiteralSnapshot::Int(v) => ConstValue::Int(i128::from(*v)),
            LiteralSnapshot::Uint(v) => ConstValue::Int(i128::from(*v)),
            LiteralSnapshot::Str(s) => ConstValue::Str(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutineSnapshot {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

impl Universe {
    pub fn from_json(json: &str) -> Result<Universe, GenerateError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Universe::from_snapshot(&snapshot)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Universe, GenerateError> {
        let snapshot: Snapshot = serde_json::from_value(value)?;
        Universe::from_snapshot(&snapshot)
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Universe, GenerateError> {
        Loader::new()?.load(snapshot)
    }
}

struct Loader {
    universe: Universe,
    lexer: Lexer,
    /// Namespaces created implicitly by references from the snapshot.
    external: HashSet<NamespaceId>,
}

impl Loader {
    fn new() -> Result<Self, GenerateError> {
        Ok(Self {
            universe: Universe::new(),
            lexer: Lexer::new()?,
            external: HashSet::new(),
        })
    }

    fn load(mut self, snapshot: &Snapshot) -> Result<Universe, GenerateError> {
        // Phase 1: namespaces and named types.
        let mut ids = Vec::with_capacity(snapshot.namespaces.len());
        for ns in &snapshot.namespaces {
            if self.universe.namespace_by_path(&ns.path).is_some() {
                return Err(snapshot_error(&ns.path, "namespace is described twice"));
            }
            let name = ns.name.clone().unwrap_or_else(|| last_segment(&ns.path));
            let id = self.universe.add_namespace(&ns.path, &name);
            for ty in &ns.types {
                let position = Position::new(ty.file.clone(), ty.line, ty.column);
                self.universe.declare_named(id, &ty.name, position);
            }
            ids.push(id);
        }

        // Phase 2: definitions and signatures.
        for (ns, id) in snapshot.namespaces.iter().zip(ids) {
            self.load_namespace(ns, id)?;
        }

        tracing::debug!(
            namespaces = snapshot.namespaces.len(),
            external = self.external.len(),
            "snapshot loaded"
        );
        Ok(self.universe)
    }

    fn load_namespace(&mut self, ns: &NamespaceSnapshot, id: NamespaceId) -> Result<(), GenerateError> {
        for ty in &ns.types {
            let named = self.local_type(id, &ty.name)?;
            let underlying = self.definition(id, ty)?;
            self.universe.set_underlying(named, underlying);

            for method in &ty.methods {
                let routine = self.routine(id, Some(named), method)?;
                self.universe.add_method(named, routine);
            }
        }

        let mut constants = Vec::with_capacity(ns.constants.len());
        for c in &ns.constants {
            constants.push(Constant {
                name: c.name.clone(),
                ty: self.parse(id, &c.ty)?,
                value: ConstValue::from(&c.value),
            });
        }
        constants.sort_by(|a, b| a.name.cmp(&b.name));

        let mut variables = Vec::with_capacity(ns.variables.len());
        for v in &ns.variables {
            variables.push((v.name.clone(), self.parse(id, &v.ty)?));
        }

        let mut functions = Vec::with_capacity(ns.functions.len());
        for f in &ns.functions {
            functions.push(self.routine(id, None, f)?);
        }
        functions.sort_by(|a, b| a.name.cmp(&b.name));

        let namespace = self.universe.namespace_mut(id);
        namespace.constants = constants;
        namespace.variables.extend(variables);
        namespace.functions = functions;
        Ok(())
    }

    fn definition(&mut self, ns: NamespaceId, ty: &TypeSnapshot) -> Result<TypeId, GenerateError> {
        match (&ty.fields, &ty.underlying, &ty.interface) {
            (Some(fields), None, None) => {
                let mut resolved = Vec::with_capacity(fields.len());
                for field in fields {
                    resolved.push(Field {
                        name: field.name.clone(),
                        exported: is_exported(&field.name),
                        ty: self.parse(ns, &field.ty)?,
                        position: Position::new(ty.file.clone(), field.line, field.column),
                    });
                }
                Ok(self.universe.intern(TypeKind::Record(resolved)))
            }
            (None, Some(expr), None) => self.parse(ns, expr),
            (None, None, Some(methods)) => {
                let mut methods = methods.clone();
                methods.sort();
                methods.dedup();
                Ok(self.universe.intern(TypeKind::Interface(methods)))
            }
            _ => Err(self.error(
                ns,
                format!(
                    "type {} must declare exactly one of fields, underlying or interface",
                    ty.name
                ),
            )),
        }
    }

    fn routine(
        &mut self,
        ns: NamespaceId,
        receiver: Option<TypeId>,
        routine: &RoutineSnapshot,
    ) -> Result<Routine, GenerateError> {
        let params = routine
            .params
            .iter()
            .map(|p| self.parse(ns, p))
            .collect::<Result<Vec<_>, _>>()?;
        let results = routine
            .results
            .iter()
            .map(|r| self.parse(ns, r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Routine {
            name: routine.name.clone(),
            namespace: ns,
            receiver,
            params,
            results,
        })
    }

    fn local_type(&self, ns: NamespaceId, name: &str) -> Result<TypeId, GenerateError> {
        self.universe
            .namespace(ns)
            .types
            .get(name)
            .map(|decl| decl.id)
            .ok_or_else(|| self.error(ns, format!("unknown type {name}")))
    }

    fn parse(&mut self, ns: NamespaceId, expr: &str) -> Result<TypeId, GenerateError> {
        let tokens = self
            .lexer
            .tokenize(expr)
            .map_err(|message| self.error(ns, message))?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let ty = self.parse_type(ns, &mut parser, expr)?;
        if parser.pos != tokens.len() {
            return Err(self.error(ns, format!("trailing input in type expression '{expr}'")));
        }
        Ok(ty)
    }

    fn parse_type(
        &mut self,
        ns: NamespaceId,
        p: &mut Parser<'_>,
        expr: &str,
    ) -> Result<TypeId, GenerateError> {
        if p.depth >= MAX_TYPE_DEPTH {
            return Err(self.error(
                ns,
                format!("type expression '{expr}' nests deeper than {MAX_TYPE_DEPTH} levels"),
            ));
        }
        p.depth += 1;
        let ty = self.parse_type_at(ns, p, expr);
        p.depth -= 1;
        ty
    }

    fn parse_type_at(
        &mut self,
        ns: NamespaceId,
        p: &mut Parser<'_>,
        expr: &str,
    ) -> Result<TypeId, GenerateError> {
        let Some(token) = p.next() else {
            return Err(self.error(ns, format!("incomplete type expression '{expr}'")));
        };

        match token {
            Token::Star => {
                let elem = self.parse_type(ns, p, expr)?;
                Ok(self.universe.pointer_to(elem))
            }
            Token::Slice => {
                let elem = self.parse_type(ns, p, expr)?;
                Ok(self.universe.sequence_of(elem))
            }
            Token::Ident(ident) => match ident.as_str() {
                "map" => {
                    self.expect(ns, p, &Token::LBracket, expr)?;
                    let key = self.parse_type(ns, p, expr)?;
                    self.expect(ns, p, &Token::RBracket, expr)?;
                    let elem = self.parse_type(ns, p, expr)?;
                    Ok(self.universe.map_of(key, elem))
                }
                "chan" => {
                    self.parse_type(ns, p, expr)?;
                    Ok(self
                        .universe
                        .intern(TypeKind::Unsupported(UnsupportedKind::Channel)))
                }
                "func" => {
                    self.expect(ns, p, &Token::LParen, expr)?;
                    self.parse_list(ns, p, expr)?;
                    match p.peek() {
                        Some(Token::LParen) => {
                            p.pos += 1;
                            self.parse_list(ns, p, expr)?;
                        }
                        Some(Token::Star | Token::Slice | Token::Ident(_)) => {
                            self.parse_type(ns, p, expr)?;
                        }
                        _ => {}
                    }
                    Ok(self
                        .universe
                        .intern(TypeKind::Unsupported(UnsupportedKind::Function)))
                }
                _ => self.resolve_name(ns, ident),
            },
            other => Err(self.error(
                ns,
                format!("unexpected {other:?} in type expression '{expr}'"),
            )),
        }
    }

    /// Comma-separated types up to and including the closing parenthesis.
    fn parse_list(
        &mut self,
        ns: NamespaceId,
        p: &mut Parser<'_>,
        expr: &str,
    ) -> Result<(), GenerateError> {
        if p.peek() == Some(&Token::RParen) {
            p.pos += 1;
            return Ok(());
        }
        loop {
            self.parse_type(ns, p, expr)?;
            match p.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(()),
                _ => {
                    return Err(self.error(ns, format!("unterminated list in '{expr}'")));
                }
            }
        }
    }

    fn expect(
        &self,
        ns: NamespaceId,
        p: &mut Parser<'_>,
        want: &Token,
        expr: &str,
    ) -> Result<(), GenerateError> {
        match p.next() {
            Some(token) if token == want => Ok(()),
            _ => Err(self.error(ns, format!("expected {want:?} in type expression '{expr}'"))),
        }
    }

    fn resolve_name(&mut self, ns: NamespaceId, ident: &str) -> Result<TypeId, GenerateError> {
        if let Some(kind) = BasicKind::from_name(ident) {
            return Ok(self.universe.basic(kind));
        }
        match ident {
            "error" => return Ok(self.universe.error_type()),
            "any" => return Ok(self.universe.intern(TypeKind::Interface(Vec::new()))),
            _ => {}
        }

        let Some((path, name)) = ident.rsplit_once(':') else {
            return self.local_type(ns, ident);
        };

        match self.universe.namespace_by_path(path) {
            Some(target) if !self.external.contains(&target) => self.local_type(target, name),
            Some(target) => Ok(self.universe.declare_named(target, name, Position::default())),
            None => {
                let target = self.universe.add_namespace(path, &last_segment(path));
                self.external.insert(target);
                tracing::debug!(path, name, "opaque external type");
                Ok(self.universe.declare_named(target, name, Position::default()))
            }
        }
    }

    fn error(&self, ns: NamespaceId, message: impl Into<String>) -> GenerateError {
        snapshot_error(&self.universe.namespace(ns).path, message)
    }
}

fn snapshot_error(namespace: &str, message: impl Into<String>) -> GenerateError {
    GenerateError::Snapshot {
        namespace: namespace.to_string(),
        message: message.into(),
    }
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

// ---------------------------------------------------------------------------
// Type expression lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Star,
    Slice,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Ident(String),
}

struct Lexer {
    pattern: Regex,
}

impl Lexer {
    fn new() -> Result<Self, GenerateError> {
        let pattern = Regex::new(
            r"^\s*(?:(?P<slice>\[\])|(?P<punct>[*\[\](),])|(?P<ident>[A-Za-z_][A-Za-z0-9_./\-]*(?::[A-Za-z_][A-Za-z0-9_]*)?))",
        )
        .map_err(|e| snapshot_error("", format!("type expression lexer: {e}")))?;
        Ok(Self { pattern })
    }

    fn tokenize(&self, expr: &str) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        let mut rest = expr;
        while !rest.trim_start().is_empty() {
            let Some(caps) = self.pattern.captures(rest) else {
                return Err(format!("cannot tokenize type expression '{expr}' at '{rest}'"));
            };
            let token = if caps.name("slice").is_some() {
                Token::Slice
            } else if let Some(p) = caps.name("punct") {
                match p.as_str() {
                    "*" => Token::Star,
                    "[" => Token::LBracket,
                    "]" => Token::RBracket,
                    "(" => Token::LParen,
                    ")" => Token::RParen,
                    _ => Token::Comma,
                }
            } else if let Some(ident) = caps.name("ident") {
                Token::Ident(ident.as_str().to_string())
            } else {
                return Err(format!("cannot tokenize type expression '{expr}'"));
            };
            tokens.push(token);
            rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
        }
        Ok(tokens)
    }
}

/// Nesting limit of a single type expression.
const MAX_TYPE_DEPTH: usize = 64;

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }
}
