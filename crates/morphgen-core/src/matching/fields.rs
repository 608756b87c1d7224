//! Ordinary field alignment.

use serde::Serialize;

use crate::config::GenerateRequest;
use crate::description::MatchDescription;
use crate::diagnostics::Diagnostics;
use crate::naming::normalize;
use crate::resolver::Resolver;
use crate::schema::RecordSchema;
use crate::types::{Field, TypeKind, Universe, UnsupportedKind};

/// Correspondence of one exported primary field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMatch {
    pub primary: Field,
    /// Secondary field with the same normalized name, if any.
    pub secondary: Option<Field>,
    pub description: MatchDescription,
    /// Force-excluded by the request. Never converted automatically.
    pub excluded: bool,
}

impl FieldMatch {
    /// The pair is converted automatically.
    pub fn is_resolved(&self) -> bool {
        !self.excluded && self.secondary.is_some() && self.description.is_match()
    }
}

/// Reject field types conversions cannot be generated for.
pub(crate) fn check_support(universe: &Universe, field: &Field, diagnostics: &mut Diagnostics) {
    let message = match universe.kind(universe.underlying(field.ty)) {
        TypeKind::Unsupported(UnsupportedKind::Function) => {
            Some("conversions of functions are impossible")
        }
        TypeKind::Unsupported(UnsupportedKind::Channel) => {
            Some("conversions of channels make no sense")
        }
        TypeKind::Pointer(elem) => match universe.kind(*elem) {
            TypeKind::Pointer(_) => Some("conversions of pointers of pointers are not supported"),
            TypeKind::Sequence(_) => Some("conversions of pointers of slices are not supported"),
            TypeKind::Map { .. } => Some("conversions of pointers of maps are not supported"),
            _ => None,
        },
        _ => None,
    };

    if let Some(message) = message {
        diagnostics.error(Some(field.position.clone()), &field.name, message);
    }
}

/// Align every exported primary field with a secondary field, in primary
/// declaration order.
pub(crate) fn match_fields(
    resolver: &mut Resolver<'_>,
    primary: &RecordSchema,
    secondary: &RecordSchema,
    request: &GenerateRequest,
    diagnostics: &mut Diagnostics,
) -> Vec<FieldMatch> {
    let universe = resolver.universe();
    let mut matches = Vec::new();

    for field in primary.exported_fields() {
        check_support(universe, field, diagnostics);

        let want = wanted_name(field, request);
        let partner = secondary
            .fields
            .iter()
            .find(|candidate| normalize(&candidate.name) == want);

        let description = match partner {
            Some(partner) => resolver.resolve(field.ty, partner.ty),
            None => MatchDescription::NoMatch,
        };

        matches.push(FieldMatch {
            primary: field.clone(),
            secondary: partner.cloned(),
            description,
            excluded: request.is_excluded(&field.name),
        });
    }

    matches
}

/// Normalized secondary name searched for `field`, honouring the override
/// table (keyed by the raw or the normalized primary name).
fn wanted_name(field: &Field, request: &GenerateRequest) -> String {
    let normalized = normalize(&field.name);
    request
        .overrides
        .get(&field.name)
        .or_else(|| request.overrides.get(&normalized))
        .map(|target| normalize(target))
        .unwrap_or(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRef;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn universe() -> Universe {
        Universe::from_value(json!({
            "namespaces": [
                {
                    "path": "a",
                    "types": [{"name": "User", "file": "a/user.go", "fields": [
                        {"name": "UserID", "type": "int64", "line": 3, "column": 2},
                        {"name": "Name", "type": "string", "line": 4, "column": 2},
                        {"name": "Nick", "type": "string", "line": 5, "column": 2},
                        {"name": "secret", "type": "string", "line": 6, "column": 2},
                        {"name": "Age", "type": "int", "line": 7, "column": 2}
                    ]}]
                },
                {
                    "path": "b",
                    "types": [{"name": "User", "fields": [
                        {"name": "user_id", "type": "int64"},
                        {"name": "Name", "type": "string"},
                        {"name": "Alias", "type": "string"},
                        {"name": "Age", "type": "string"}
                    ]}]
                }
            ]
        }))
        .unwrap()
    }

    fn run(request: &GenerateRequest) -> (Vec<FieldMatch>, Diagnostics) {
        let u = universe();
        let primary = u.record(&SchemaRef::new("a", "User")).unwrap();
        let secondary = u.record(&SchemaRef::new("b", "User")).unwrap();
        let mut resolver = Resolver::new(&u);
        let mut diagnostics = Diagnostics::new();
        let matches = match_fields(&mut resolver, &primary, &secondary, request, &mut diagnostics);
        (matches, diagnostics)
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(SchemaRef::new("a", "User"), SchemaRef::new("b", "User"))
    }

    #[test]
    fn test_every_exported_primary_field_gets_one_match() {
        let (matches, diagnostics) = run(&request());
        assert!(diagnostics.is_empty());

        let summary: Vec<_> = matches
            .iter()
            .map(|m| {
                (
                    m.primary.name.as_str(),
                    m.secondary.as_ref().map(|f| f.name.as_str()),
                    m.description.clone(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("UserID", Some("user_id"), MatchDescription::Direct),
                ("Name", Some("Name"), MatchDescription::Direct),
                ("Nick", None, MatchDescription::NoMatch),
                ("Age", Some("Age"), MatchDescription::NoMatch),
            ]
        );
        assert!(!matches[3].is_resolved());
    }

    #[test]
    fn test_override_table_redirects_search() {
        let mut request = request();
        request.overrides.insert("Nick".into(), "Alias".into());
        let (matches, _) = run(&request);
        let nick = matches.iter().find(|m| m.primary.name == "Nick").unwrap();
        assert_eq!(nick.secondary.as_ref().unwrap().name, "Alias");
        assert!(nick.is_resolved());
    }

    #[test]
    fn test_excluded_field_is_never_resolved() {
        let mut request = request();
        request.exclude.push("Name".into());
        let (matches, _) = run(&request);
        let name = matches.iter().find(|m| m.primary.name == "Name").unwrap();
        assert!(name.excluded);
        assert_eq!(name.description, MatchDescription::Direct);
        assert!(!name.is_resolved());
    }

    #[test]
    fn test_unsupported_types_are_collected() {
        let mut u = Universe::from_value(json!({
            "namespaces": [{
                "path": "a",
                "types": [{"name": "Handler", "underlying": "func(string) error"}]
            }]
        }))
        .unwrap();
        let ns = u.namespace_by_path("a").unwrap();
        let handler = u.namespace(ns).types["Handler"].id;
        let int = u.basic(crate::types::BasicKind::Int);
        let ints = u.sequence_of(int);
        let ptr_ints = u.pointer_to(ints);
        let ptr_ptr = {
            let p = u.pointer_to(int);
            u.pointer_to(p)
        };

        let mut diagnostics = Diagnostics::new();
        for (name, ty) in [("OnSave", handler), ("Tags", ptr_ints), ("Ref", ptr_ptr), ("Ok", int)] {
            let field = Field {
                name: name.to_string(),
                exported: true,
                ty,
                position: Default::default(),
            };
            check_support(&u, &field, &mut diagnostics);
        }

        let messages: Vec<_> = diagnostics.errors().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                ":0:0 OnSave: conversions of functions are impossible",
                ":0:0 Tags: conversions of pointers of slices are not supported",
                ":0:0 Ref: conversions of pointers of pointers are not supported",
            ]
        );
    }
}
