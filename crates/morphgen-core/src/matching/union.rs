//! Union (discriminated variant) field alignment.
//!
//! A secondary field is a union when its type is named
//! `is<Record>_<Field>` and is an interface whose only method carries the same
//! name. Every exported record type in that namespace implementing the method
//! is a branch; a branch's payload is its first field, reachable on the
//! secondary root through `Get<Payload>`.
//!
//! Binding is all-or-nothing: every branch must claim a distinct primary field
//! left unmatched by ordinary matching, or the union is discarded and no field
//! is consumed. A primary field can only claim a branch when its presence is
//! testable with `!=`, which rules out records holding slices or maps.

use serde::Serialize;

use crate::config::GenerateRequest;
use crate::description::MatchDescription;
use crate::error::GenerateError;
use crate::naming::{getter_name, is_exported, normalize, union_marker};
use crate::resolver::Resolver;
use crate::schema::RecordSchema;
use crate::types::{Field, TypeId, TypeKind, Universe};

use super::fields::FieldMatch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    /// Name of the branch record type.
    pub type_name: String,
    #[serde(rename = "type")]
    pub ty: TypeId,
    /// First field of the branch record.
    pub payload: Field,
    /// Accessor on the secondary root returning the payload.
    pub getter: String,
    /// Primary field the branch is bound to.
    pub primary: Field,
    /// Strategy converting the primary field into the payload.
    pub description: MatchDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionCorrespondence {
    /// The discriminated secondary field.
    pub secondary: Field,
    pub branches: Vec<Branch>,
}

impl UnionCorrespondence {
    pub fn branch_for_primary(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.primary.name == name)
    }
}

/// Detect union fields on the secondary record and bind their branches to
/// unmatched primary fields. Consumed primary fields are removed from
/// `fields`.
pub(crate) fn match_unions(
    resolver: &mut Resolver<'_>,
    secondary: &RecordSchema,
    fields: &mut Vec<FieldMatch>,
    request: &GenerateRequest,
) -> Result<Vec<UnionCorrespondence>, GenerateError> {
    let universe = resolver.universe();
    let mut unions = Vec::new();

    for field in secondary.exported_fields() {
        let Some(marker) = marker_of(universe, secondary, field) else {
            continue;
        };
        let branch_types = implementations(universe, field.ty, &marker);
        if branch_types.is_empty() {
            continue;
        }

        match bind(resolver, secondary, field, &branch_types, fields, request)? {
            Some((union, consumed)) => {
                tracing::debug!(
                    field = %field.name,
                    branches = union.branches.len(),
                    "union bound"
                );
                let mut index = 0;
                fields.retain(|_| {
                    let keep = !consumed.contains(&index);
                    index += 1;
                    keep
                });
                unions.push(union);
            }
            None => {
                tracing::debug!(field = %field.name, "union discarded, not every branch binds");
            }
        }
    }

    Ok(unions)
}

/// Marker name when `field` follows the union convention.
fn marker_of(universe: &Universe, secondary: &RecordSchema, field: &Field) -> Option<String> {
    let (_, type_name) = universe.named_parts(field.ty)?;
    let marker = union_marker(&secondary.name, &field.name);
    if type_name != marker {
        return None;
    }
    match universe.kind(universe.underlying(field.ty)) {
        TypeKind::Interface(methods) if methods.len() == 1 && methods[0] == marker => Some(marker),
        _ => None,
    }
}

/// Exported record types declared next to the marker type that implement
/// the marker method, sorted by name.
fn implementations(universe: &Universe, marker_ty: TypeId, marker: &str) -> Vec<(String, TypeId)> {
    let Some((namespace, _)) = universe.named_parts(marker_ty) else {
        return Vec::new();
    };
    universe
        .namespace(namespace)
        .types
        .iter()
        .filter(|(name, decl)| {
            is_exported(name)
                && matches!(universe.kind(universe.underlying(decl.id)), TypeKind::Record(_))
                && universe.method(decl.id, marker).is_some()
        })
        .map(|(name, decl)| (name.clone(), decl.id))
        .collect()
}

fn bind(
    resolver: &mut Resolver<'_>,
    secondary: &RecordSchema,
    field: &Field,
    branch_types: &[(String, TypeId)],
    fields: &[FieldMatch],
    request: &GenerateRequest,
) -> Result<Option<(UnionCorrespondence, Vec<usize>)>, GenerateError> {
    let universe = resolver.universe();
    let mut branches = Vec::with_capacity(branch_types.len());
    let mut consumed = Vec::with_capacity(branch_types.len());

    for (type_name, ty) in branch_types {
        let payload = match universe.kind(universe.underlying(*ty)) {
            TypeKind::Record(record) => record.first().cloned(),
            _ => None,
        };
        let Some(payload) = payload else {
            return Err(GenerateError::synthesis(format!(
                "branch {type_name} of union {} has no payload field",
                field.name
            )));
        };

        let getter = getter_name(&payload.name);
        let Some(returned) = universe
            .method(secondary.ty, &getter)
            .and_then(|m| m.results.first().copied())
        else {
            return Ok(None);
        };
        if !resolver.resolve(returned, payload.ty).is_match() {
            return Ok(None);
        }

        let wanted = normalize(&payload.name);
        let mut bound = None;
        for (index, candidate) in fields.iter().enumerate() {
            if candidate.is_resolved()
                || candidate.excluded
                || request.is_excluded(&candidate.primary.name)
                || consumed.contains(&index)
                || normalize(&candidate.primary.name) != wanted
                || !universe.is_comparable(candidate.primary.ty)
            {
                continue;
            }
            if !resolver.resolve(candidate.primary.ty, returned).is_match() {
                continue;
            }
            let description = resolver.resolve(candidate.primary.ty, payload.ty);
            if description.is_match() {
                bound = Some((index, description));
                break;
            }
        }

        let Some((index, description)) = bound else {
            return Ok(None);
        };
        consumed.push(index);
        branches.push(Branch {
            type_name: type_name.clone(),
            ty: *ty,
            payload,
            getter,
            primary: fields[index].primary.clone(),
            description,
        });
    }

    Ok(Some((
        UnionCorrespondence {
            secondary: field.clone(),
            branches,
        },
        consumed,
    )))
}
