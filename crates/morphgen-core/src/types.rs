//! Indexed type registry.
//!
//! Every type the engine reasons about lives in a [`Universe`] and is referred
//! to by a copyable [`TypeId`]. Structural types are interned, so type identity
//! is a plain id comparison. Named types are keyed by `(namespace, name)` and
//! get their underlying type attached after declaration, which keeps
//! self-referential declarations finite: the resolver recurses over ids, never
//! over embedded structures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::naming::is_exported;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NamespaceId(u32);

impl NamespaceId {
    /// The namespace holding predeclared types such as `error`.
    pub const BUILTIN: NamespaceId = NamespaceId(0);
}

// ---------------------------------------------------------------------------
// Basic kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
}

impl BasicKind {
    /// Look up a basic kind by its source name, including the `byte` and
    /// `rune` aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => BasicKind::Bool,
            "int" => BasicKind::Int,
            "int8" => BasicKind::Int8,
            "int16" => BasicKind::Int16,
            "int32" | "rune" => BasicKind::Int32,
            "int64" => BasicKind::Int64,
            "uint" => BasicKind::Uint,
            "uint8" | "byte" => BasicKind::Uint8,
            "uint16" => BasicKind::Uint16,
            "uint32" => BasicKind::Uint32,
            "uint64" => BasicKind::Uint64,
            "uintptr" => BasicKind::Uintptr,
            "float32" => BasicKind::Float32,
            "float64" => BasicKind::Float64,
            "complex64" => BasicKind::Complex64,
            "complex128" => BasicKind::Complex128,
            "string" => BasicKind::String,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
        }
    }

    /// Signed or unsigned integer of any width, `uintptr` excluded.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
        )
    }

    /// Integers and floats: every member of this family converts to every
    /// other member with a plain cast.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, BasicKind::Float32 | BasicKind::Float64)
    }

    /// Representations an enumeration may be declared over.
    pub fn is_enumerable(self) -> bool {
        self.is_integer() || self == BasicKind::String
    }

    /// Literal of the kind's zero value, when it has a simple one.
    pub fn zero_literal(self) -> Option<&'static str> {
        if self.is_numeric() {
            return Some("0");
        }
        match self {
            BasicKind::String => Some(r#""""#),
            BasicKind::Bool => Some("false"),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Source position used in diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A record member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Field {
    pub name: String,
    pub exported: bool,
    #[serde(rename = "type")]
    pub ty: TypeId,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedKind {
    Function,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Basic(BasicKind),
    Named { namespace: NamespaceId, name: String },
    Pointer(TypeId),
    Sequence(TypeId),
    Map { key: TypeId, elem: TypeId },
    Record(Vec<Field>),
    /// Method names, sorted.
    Interface(Vec<String>),
    Unsupported(UnsupportedKind),
}

/// Literal value of a declared constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ConstValue {
    Int(i128),
    Str(String),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeId,
    pub value: ConstValue,
}

/// A function or method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Routine {
    pub name: String,
    pub namespace: NamespaceId,
    /// Named type the routine is declared on, `None` for free functions.
    pub receiver: Option<TypeId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
}

impl Routine {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub id: TypeId,
    pub position: Position,
}

/// A namespace (package) snapshot.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub path: String,
    pub name: String,
    /// Declared named types, sorted by name.
    pub types: BTreeMap<String, TypeDecl>,
    pub constants: Vec<Constant>,
    pub variables: BTreeMap<String, TypeId>,
    /// Free functions, sorted by name.
    pub functions: Vec<Routine>,
}

impl Namespace {
    fn new(path: String, name: String) -> Self {
        Self {
            path,
            name,
            types: BTreeMap::new(),
            constants: Vec::new(),
            variables: BTreeMap::new(),
            functions: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// Read-only snapshot of every namespace and type known to a generation run.
#[derive(Debug, Clone)]
pub struct Universe {
    kinds: Vec<TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
    underlying: HashMap<TypeId, TypeId>,
    methods: HashMap<TypeId, Vec<Routine>>,
    namespaces: Vec<Namespace>,
    by_path: HashMap<String, NamespaceId>,
    error: TypeId,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    pub fn new() -> Self {
        let mut universe = Self {
            kinds: Vec::new(),
            interned: HashMap::new(),
            underlying: HashMap::new(),
            methods: HashMap::new(),
            namespaces: vec![Namespace::new(String::new(), String::new())],
            by_path: HashMap::new(),
            error: TypeId(0),
        };

        let error = universe.intern(TypeKind::Named {
            namespace: NamespaceId::BUILTIN,
            name: "error".to_string(),
        });
        let iface = universe.intern(TypeKind::Interface(vec!["Error".to_string()]));
        universe.underlying.insert(error, iface);
        universe.error = error;
        universe
    }

    // -- construction -------------------------------------------------------

    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(id) = self.interned.get(&kind) {
            return *id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.intern(TypeKind::Basic(kind))
    }

    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer(elem))
    }

    pub fn sequence_of(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Sequence(elem))
    }

    pub fn map_of(&mut self, key: TypeId, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Map { key, elem })
    }

    /// Register a namespace, returning the existing id if the path is known.
    pub fn add_namespace(&mut self, path: &str, name: &str) -> NamespaceId {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }
        let id = NamespaceId(self.namespaces.len() as u32);
        self.namespaces
            .push(Namespace::new(path.to_string(), name.to_string()));
        self.by_path.insert(path.to_string(), id);
        id
    }

    /// Declare a named type in `namespace`. The underlying type is attached
    /// later with [`Universe::set_underlying`].
    pub fn declare_named(&mut self, namespace: NamespaceId, name: &str, position: Position) -> TypeId {
        let id = self.intern(TypeKind::Named {
            namespace,
            name: name.to_string(),
        });
        self.namespaces[namespace.0 as usize]
            .types
            .insert(name.to_string(), TypeDecl { id, position });
        id
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        self.underlying.insert(named, underlying);
    }

    pub fn add_method(&mut self, receiver: TypeId, method: Routine) {
        let methods = self.methods.entry(receiver).or_default();
        methods.push(method);
        methods.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn namespace_mut(&mut self, id: NamespaceId) -> &mut Namespace {
        &mut self.namespaces[id.0 as usize]
    }

    // -- lookup -------------------------------------------------------------

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.0 as usize]
    }

    pub fn namespace(&self, id: NamespaceId) -> &Namespace {
        &self.namespaces[id.0 as usize]
    }

    pub fn namespace_by_path(&self, path: &str) -> Option<NamespaceId> {
        self.by_path.get(path).copied()
    }

    pub fn error_type(&self) -> TypeId {
        self.error
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id == self.error
    }

    /// Methods declared on a named type, sorted by name.
    pub fn methods(&self, named: TypeId) -> &[Routine] {
        self.methods.get(&named).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn method(&self, named: TypeId, name: &str) -> Option<&Routine> {
        self.methods(named).iter().find(|m| m.name == name)
    }

    pub fn is_named(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Named { .. })
    }

    pub fn named_parts(&self, id: TypeId) -> Option<(NamespaceId, &str)> {
        match self.kind(id) {
            TypeKind::Named { namespace, name } => Some((*namespace, name.as_str())),
            _ => None,
        }
    }

    /// Underlying type: the type itself for unnamed types, the (transitively
    /// resolved) definition for named ones.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut current = id;
        // A chain longer than the registry would be a cycle of pure renames.
        for _ in 0..=self.kinds.len() {
            if !self.is_named(current) {
                return current;
            }
            match self.underlying.get(&current) {
                Some(next) if *next != current => current = *next,
                _ => return current,
            }
        }
        current
    }

    pub fn pointer_elem(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Pointer(elem) => Some(*elem),
            _ => None,
        }
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        self.pointer_elem(id).is_some()
    }

    /// Remove one level of pointer indirection, if any.
    pub fn strip_pointer(&self, id: TypeId) -> TypeId {
        self.pointer_elem(id).unwrap_or(id)
    }

    /// Remove every named wrapper, leaving the structural representation.
    pub fn strip_named(&self, id: TypeId) -> TypeId {
        self.underlying(id)
    }

    /// Types whose zero value is `nil`.
    pub fn is_nilable(&self, id: TypeId) -> bool {
        matches!(
            self.kind(self.underlying(id)),
            TypeKind::Pointer(_)
                | TypeKind::Sequence(_)
                | TypeKind::Map { .. }
                | TypeKind::Interface(_)
                | TypeKind::Unsupported(_)
        )
    }

    /// Basic kind of the type, looking through named wrappers.
    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.kind(self.underlying(id)) {
            TypeKind::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Declared named types and predeclared basic types. Both carry their own
    /// identity: two distinct defined types never assign to each other.
    pub fn is_defined(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Named { .. } | TypeKind::Basic(_))
    }

    /// Assignability: identical types, or identical underlying types when at
    /// least one side is an unnamed composite such as `[]string`.
    pub fn assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if self.is_defined(from) && self.is_defined(to) {
            return false;
        }
        self.underlying(from) == self.underlying(to)
    }

    /// Whether values of the type support `==`. Sequences, maps and functions
    /// do not, nor do records holding one of them by value.
    pub fn is_comparable(&self, id: TypeId) -> bool {
        self.comparable(id, &mut HashSet::new())
    }

    fn comparable(&self, id: TypeId, seen: &mut HashSet<TypeId>) -> bool {
        let ty = self.underlying(id);
        match self.kind(ty) {
            TypeKind::Sequence(_)
            | TypeKind::Map { .. }
            | TypeKind::Unsupported(UnsupportedKind::Function) => false,
            TypeKind::Record(fields) => {
                // Already being checked further up, or checked before.
                if !seen.insert(ty) {
                    return true;
                }
                fields.iter().all(|f| self.comparable(f.ty, seen))
            }
            _ => true,
        }
    }

    /// Human-readable rendering for logs and reports.
    pub fn display(&self, id: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { universe: self, id }
    }
}

/// [`fmt::Display`] adapter returned by [`Universe::display`].
pub struct TypeDisplay<'u> {
    universe: &'u Universe,
    id: TypeId,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = self.universe;
        match u.kind(self.id) {
            TypeKind::Basic(kind) => f.write_str(kind.name()),
            TypeKind::Named { namespace, name } => {
                let ns = u.namespace(*namespace);
                if ns.name.is_empty() {
                    f.write_str(name)
                } else {
                    write!(f, "{}.{}", ns.name, name)
                }
            }
            TypeKind::Pointer(elem) => write!(f, "*{}", u.display(*elem)),
            TypeKind::Sequence(elem) => write!(f, "[]{}", u.display(*elem)),
            TypeKind::Map { key, elem } => {
                write!(f, "map[{}]{}", u.display(*key), u.display(*elem))
            }
            TypeKind::Record(fields) => {
                f.write_str("struct{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{} {}", field.name, u.display(field.ty))?;
                }
                f.write_str("}")
            }
            TypeKind::Interface(methods) if methods.is_empty() => f.write_str("any"),
            TypeKind::Interface(methods) => {
                f.write_str("interface{")?;
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{method}()")?;
                }
                f.write_str("}")
            }
            TypeKind::Unsupported(UnsupportedKind::Function) => f.write_str("func"),
            TypeKind::Unsupported(UnsupportedKind::Channel) => f.write_str("chan"),
        }
    }
}
