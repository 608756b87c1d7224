//! Enumeration classifier.
//!
//! A named type is an enumeration when its underlying kind is an integer or a
//! string and its namespace declares at least one constant of exactly that
//! type. Enumerations whose namespace also declares `<Name>_name` and
//! `<Name>_value` lookup tables are index-style.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::naming::{enum_name_table, enum_value_table};
use crate::types::{ConstValue, Constant, NamespaceId, TypeId, TypeKind, Universe};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDescription {
    #[serde(rename = "type")]
    pub ty: TypeId,
    pub namespace: NamespaceId,
    pub name: String,
    /// Constants of exactly this type, sorted by name.
    pub constants: Vec<Constant>,
    pub index_style: bool,
    /// Key type of the literal-to-name table of an index-style enumeration.
    #[serde(skip)]
    pub lookup_key: Option<TypeId>,
}

impl EnumDescription {
    /// Distinct literal values, sorted.
    pub fn values(&self) -> BTreeSet<&ConstValue> {
        self.constants.iter().map(|c| &c.value).collect()
    }

    /// Value-set equality. Constant names and declaration order are
    /// irrelevant.
    pub fn same_values(&self, other: &EnumDescription) -> bool {
        self.values() == other.values()
    }

    /// First constant (by name) carrying `value`.
    pub fn constant_for(&self, value: &ConstValue) -> Option<&Constant> {
        self.constants.iter().find(|c| &c.value == value)
    }
}

/// Outcome of classifying both sides of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumMatch {
    NotEnums,
    OneSided,
    Different,
    Matched {
        primary: EnumDescription,
        secondary: EnumDescription,
    },
}

/// Classify `ty` (looking through one pointer) as an enumeration.
pub fn classify(universe: &Universe, ty: TypeId) -> Option<EnumDescription> {
    let ty = universe.strip_pointer(ty);
    let (namespace, name) = universe.named_parts(ty)?;
    if !universe.basic_kind(ty)?.is_enumerable() {
        return None;
    }

    let ns = universe.namespace(namespace);
    let constants: Vec<Constant> = ns
        .constants
        .iter()
        .filter(|c| c.ty == ty)
        .cloned()
        .collect();
    if constants.is_empty() {
        return None;
    }

    let name_table = ns.variables.get(&enum_name_table(name)).copied();
    let has_value_table = ns.variables.contains_key(&enum_value_table(name));
    let lookup_key = name_table
        .filter(|_| has_value_table)
        .and_then(|table| match universe.kind(universe.underlying(table)) {
            TypeKind::Map { key, .. } => Some(*key),
            _ => None,
        });

    Some(EnumDescription {
        ty,
        namespace,
        name: name.to_string(),
        constants,
        index_style: lookup_key.is_some(),
        lookup_key,
    })
}

pub fn match_enums(universe: &Universe, prim: TypeId, sec: TypeId) -> EnumMatch {
    match (classify(universe, prim), classify(universe, sec)) {
        (None, None) => EnumMatch::NotEnums,
        (Some(_), None) | (None, Some(_)) => EnumMatch::OneSided,
        (Some(primary), Some(secondary)) if primary.same_values(&secondary) => {
            EnumMatch::Matched { primary, secondary }
        }
        (Some(_), Some(_)) => EnumMatch::Different,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn universe() -> Universe {
        Universe::from_value(json!({
            "namespaces": [
                {
                    "path": "a",
                    "types": [
                        {"name": "Color", "underlying": "int"},
                        {"name": "Shade", "underlying": "int"},
                        {"name": "Plain", "underlying": "int"},
                        {"name": "Kind", "underlying": "string"},
                        {"name": "Ratio", "underlying": "float64"}
                    ],
                    "constants": [
                        {"name": "Red", "type": "Color", "value": 0},
                        {"name": "Green", "type": "Color", "value": 1},
                        {"name": "Dark", "type": "Shade", "value": 0},
                        {"name": "Light", "type": "Shade", "value": 2},
                        {"name": "KindA", "type": "Kind", "value": "a"},
                        {"name": "Half", "type": "Ratio", "value": 0},
                        {"name": "Untyped", "type": "int", "value": 0}
                    ]
                },
                {
                    "path": "b",
                    "types": [{"name": "Hue", "underlying": "int32"}],
                    "constants": [
                        {"name": "Hue_X", "type": "Hue", "value": 0},
                        {"name": "Hue_Y", "type": "Hue", "value": 1}
                    ],
                    "variables": [
                        {"name": "Hue_name", "type": "map[int32]string"},
                        {"name": "Hue_value", "type": "map[string]int32"}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn ty(u: &Universe, path: &str, name: &str) -> TypeId {
        let ns = u.namespace_by_path(path).unwrap();
        u.namespace(ns).types[name].id
    }

    #[test]
    fn test_classify() {
        let u = universe();
        let color = classify(&u, ty(&u, "a", "Color")).unwrap();
        assert_eq!(color.constants.len(), 2);
        assert_eq!(color.constants[0].name, "Green", "sorted by name");
        assert!(!color.index_style);

        assert!(classify(&u, ty(&u, "a", "Kind")).is_some());
        assert!(classify(&u, ty(&u, "a", "Plain")).is_none(), "no constants");
        assert!(classify(&u, ty(&u, "a", "Ratio")).is_none(), "float kind");
    }

    #[test]
    fn test_index_style_enumeration() {
        let u = universe();
        let hue = classify(&u, ty(&u, "b", "Hue")).unwrap();
        assert!(hue.index_style);
        assert_eq!(u.display(hue.lookup_key.unwrap()).to_string(), "int32");
    }

    #[test]
    fn test_value_set_equality_ignores_names() {
        let u = universe();
        let color = ty(&u, "a", "Color");
        let hue = ty(&u, "b", "Hue");
        let shade = ty(&u, "a", "Shade");
        let plain = ty(&u, "a", "Plain");

        assert!(matches!(match_enums(&u, color, hue), EnumMatch::Matched { .. }));
        assert_eq!(match_enums(&u, color, shade), EnumMatch::Different);
        assert_eq!(match_enums(&u, color, plain), EnumMatch::OneSided);
        assert_eq!(match_enums(&u, plain, plain), EnumMatch::NotEnums);
    }
}
