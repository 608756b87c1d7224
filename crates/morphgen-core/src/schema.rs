//! Record schema references and lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::types::{Field, NamespaceId, Position, TypeId, TypeKind, Universe};

/// A `<namespace-path>:<TypeName>` reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaRef {
    pub namespace: String,
    pub name: String,
}

impl SchemaRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl FromStr for SchemaRef {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Paths may contain dots and slashes but never a colon, so the last
        // colon separates the type name.
        match s.rsplit_once(':') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(SchemaRef::new(namespace, name))
            }
            _ => Err(GenerateError::InvalidSchemaRef(s.to_string())),
        }
    }
}

impl TryFrom<String> for SchemaRef {
    type Error = GenerateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaRef> for String {
    fn from(value: SchemaRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// A resolved record: a named type whose underlying type is a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: String,
    pub namespace: NamespaceId,
    pub ty: TypeId,
    pub position: Position,
    /// Declaration order drives emission order and tie-breaking.
    pub fields: Vec<Field>,
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn exported_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.exported)
    }
}

impl Universe {
    /// Resolve a reference into a record schema.
    pub fn record(&self, reference: &SchemaRef) -> Result<RecordSchema, GenerateError> {
        let not_found = || GenerateError::SchemaNotFound {
            reference: reference.to_string(),
        };

        let namespace = self
            .namespace_by_path(&reference.namespace)
            .ok_or_else(not_found)?;
        let decl = self
            .namespace(namespace)
            .types
            .get(&reference.name)
            .ok_or_else(not_found)?;

        self.record_of(decl.id, decl.position.clone())
            .ok_or_else(|| GenerateError::NotARecord {
                reference: reference.to_string(),
            })
    }

    /// Record view of a named type, `None` if its underlying type is not a
    /// record.
    pub fn record_of(&self, ty: TypeId, position: Position) -> Option<RecordSchema> {
        let (namespace, name) = self.named_parts(ty)?;
        match self.kind(self.underlying(ty)) {
            TypeKind::Record(fields) => Some(RecordSchema {
                name: name.to_string(),
                namespace,
                ty,
                position,
                fields: fields.clone(),
            }),
            _ => None,
        }
    }
}
