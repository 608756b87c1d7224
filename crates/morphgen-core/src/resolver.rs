//! Type equivalence resolver.
//!
//! Decides whether a primary type and a secondary type are interchangeable
//! and by which strategy. Rules are evaluated in strict priority order; once
//! a rule fires, later rules are never consulted for that pair:
//!
//! 1. identical or assignable types: `Direct` (a defined type never assigns
//!    to a different defined type, predeclared basic types included)
//! 2. strip one pointer from the primary side, then from the secondary side
//! 3. conversion routines `prim -> sec`, then `sec -> prim` with roles swapped
//! 4. enumerations: both must be enumerations with equal value sets, anything
//!    one-sided or unequal is a terminal `NoMatch`
//! 5. assignable types: `Castable`
//! 6. assignable underlying representations: `Castable`
//! 7. sequences with resolvable elements
//! 8. maps with resolvable keys and elements
//! 9. numeric kinds of any width: `Castable`
//! 10. `NoMatch`

use std::collections::{HashMap, HashSet};

use crate::conversion::discover;
use crate::description::MatchDescription;
use crate::enums::{match_enums, EnumMatch};
use crate::types::{TypeId, TypeKind, Universe};

pub struct Resolver<'u> {
    universe: &'u Universe,
    memo: HashMap<(TypeId, TypeId), MatchDescription>,
    in_progress: HashSet<(TypeId, TypeId)>,
}

impl<'u> Resolver<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self {
            universe,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn universe(&self) -> &'u Universe {
        self.universe
    }

    /// Resolve the strategy converting `prim` into `sec`.
    pub fn resolve(&mut self, prim: TypeId, sec: TypeId) -> MatchDescription {
        if let Some(known) = self.memo.get(&(prim, sec)) {
            return known.clone();
        }
        // Re-entering a pair means the declarations are cyclic.
        if !self.in_progress.insert((prim, sec)) {
            return MatchDescription::NoMatch;
        }

        let descr = self.resolve_uncached(prim, sec);
        self.in_progress.remove(&(prim, sec));

        tracing::debug!(
            primary = %self.universe.display(prim),
            secondary = %self.universe.display(sec),
            strategy = %descr,
            "resolved"
        );
        self.memo.insert((prim, sec), descr.clone());
        descr
    }

    fn resolve_uncached(&mut self, prim: TypeId, sec: TypeId) -> MatchDescription {
        let u = self.universe;

        if u.assignable(prim, sec) {
            return MatchDescription::Direct;
        }

        if let Some(elem) = u.pointer_elem(prim) {
            return self.resolve(elem, sec);
        }
        if let Some(elem) = u.pointer_elem(sec) {
            return self.resolve(prim, elem);
        }

        if let Some(pair) = discover(u, prim, sec) {
            return MatchDescription::Conversion {
                forward: pair.to,
                backward: pair.back,
            };
        }
        if let Some(pair) = discover(u, sec, prim) {
            return MatchDescription::Conversion {
                forward: pair.back,
                backward: pair.to,
            };
        }

        match match_enums(u, prim, sec) {
            EnumMatch::NotEnums => {}
            EnumMatch::OneSided | EnumMatch::Different => return MatchDescription::NoMatch,
            EnumMatch::Matched { primary, secondary } => {
                return MatchDescription::Enum { primary, secondary };
            }
        }

        if u.assignable(prim, sec) || u.assignable(u.strip_named(prim), u.strip_named(sec)) {
            return MatchDescription::Castable;
        }

        match (u.kind(prim), u.kind(sec)) {
            (TypeKind::Sequence(p), TypeKind::Sequence(s)) => {
                let (p, s) = (*p, *s);
                return match self.resolve(p, s) {
                    MatchDescription::NoMatch => MatchDescription::NoMatch,
                    elem => MatchDescription::Sequence {
                        elem: Box::new(elem),
                    },
                };
            }
            (TypeKind::Sequence(_), _) | (_, TypeKind::Sequence(_)) => {
                return MatchDescription::NoMatch;
            }
            _ => {}
        }

        match (u.kind(prim), u.kind(sec)) {
            (
                TypeKind::Map { key: pk, elem: pe },
                TypeKind::Map { key: sk, elem: se },
            ) => {
                let (pk, pe, sk, se) = (*pk, *pe, *sk, *se);
                let key = self.resolve(pk, sk);
                if !key.is_match() {
                    return MatchDescription::NoMatch;
                }
                return match self.resolve(pe, se) {
                    MatchDescription::NoMatch => MatchDescription::NoMatch,
                    elem => MatchDescription::Map {
                        key: Box::new(key),
                        elem: Box::new(elem),
                    },
                };
            }
            (TypeKind::Map { .. }, _) | (_, TypeKind::Map { .. }) => {
                return MatchDescription::NoMatch;
            }
            _ => {}
        }

        let numeric = |ty| u.basic_kind(ty).is_some_and(|k| k.is_numeric());
        if numeric(prim) && numeric(sec) {
            return MatchDescription::Castable;
        }

        MatchDescription::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn universe() -> Universe {
        Universe::from_value(json!({
            "namespaces": [
                {
                    "path": "a",
                    "types": [
                        {"name": "Status", "underlying": "int"},
                        {"name": "Level", "underlying": "int"},
                        {"name": "Count", "underlying": "int32"},
                        {"name": "Name", "underlying": "string"},
                        {"name": "Names", "underlying": "[]string"},
                        {"name": "Node", "fields": [{"name": "Next", "type": "*Node"}]},
                        {"name": "Money", "fields": [{"name": "Cents", "type": "int64"}]}
                    ],
                    "constants": [
                        {"name": "StatusA", "type": "Status", "value": 0},
                        {"name": "StatusB", "type": "Status", "value": 1}
                    ]
                },
                {
                    "path": "b",
                    "types": [
                        {"name": "Status", "underlying": "int32"},
                        {"name": "Other", "underlying": "int"},
                        {"name": "Node", "fields": [{"name": "Next", "type": "*Node"}]},
                        {"name": "Money", "fields": [{"name": "Units", "type": "int64"}],
                         "methods": [{"name": "Domain", "results": ["a:Money"]}]}
                    ],
                    "constants": [
                        {"name": "Status_X", "type": "Status", "value": 0},
                        {"name": "Status_Y", "type": "Status", "value": 1},
                        {"name": "OtherA", "type": "Other", "value": 0},
                        {"name": "OtherB", "type": "Other", "value": 2}
                    ],
                    "functions": [
                        {"name": "MoneyFromDomain", "params": ["a:Money"], "results": ["*Money", "error"]}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    fn named(u: &Universe, path: &str, name: &str) -> TypeId {
        let ns = u.namespace_by_path(path).unwrap();
        u.namespace(ns).types[name].id
    }

    fn parse(u: &mut Universe, expr: &str) -> TypeId {
        use crate::types::BasicKind;
        let mut inner = expr;
        let mut wrappers = Vec::new();
        loop {
            if let Some(rest) = inner.strip_prefix('*') {
                wrappers.push('*');
                inner = rest;
            } else if let Some(rest) = inner.strip_prefix("[]") {
                wrappers.push('[');
                inner = rest;
            } else {
                break;
            }
        }
        let mut ty = u.basic(BasicKind::from_name(inner).unwrap());
        for w in wrappers.into_iter().rev() {
            ty = if w == '*' { u.pointer_to(ty) } else { u.sequence_of(ty) };
        }
        ty
    }

    #[test]
    fn test_identical_types_are_direct() {
        let mut u = universe();
        let s = parse(&mut u, "string");
        let mut r = Resolver::new(&u);
        assert_eq!(r.resolve(s, s), MatchDescription::Direct);
    }

    #[test]
    fn test_pointer_stripped_on_either_side() {
        let mut u = universe();
        let s = parse(&mut u, "string");
        let ps = parse(&mut u, "*string");
        let mut r = Resolver::new(&u);
        assert_eq!(r.resolve(ps, s), MatchDescription::Direct);
        assert_eq!(r.resolve(s, ps), MatchDescription::Direct);
    }

    #[test]
    fn test_named_basic_and_its_underlying_are_castable() {
        let mut u = universe();
        let s = parse(&mut u, "string");
        let name = named(&u, "a", "Name");
        let mut r = Resolver::new(&u);
        assert_eq!(r.resolve(name, s), MatchDescription::Castable);
        assert_eq!(r.resolve(s, name), MatchDescription::Castable);
    }

    #[test]
    fn test_conversion_found_in_reverse_direction_swaps_roles() {
        let u = universe();
        let a = named(&u, "a", "Money");
        let b = named(&u, "b", "Money");
        let mut r = Resolver::new(&u);

        let MatchDescription::Conversion { forward, backward } = r.resolve(a, b) else {
            panic!("expected conversion");
        };
        assert_eq!(forward.routine.name(), "MoneyFromDomain");
        assert!(forward.fallible);
        assert_eq!(backward.routine.name(), "Domain");

        let MatchDescription::Conversion { forward, .. } = r.resolve(b, a) else {
            panic!("expected conversion");
        };
        assert_eq!(forward.routine.name(), "Domain");
    }

    #[test]
    fn test_enum_value_sets() {
        let u = universe();
        let mut r = Resolver::new(&u);
        let status = named(&u, "a", "Status");

        assert!(matches!(
            r.resolve(status, named(&u, "b", "Status")),
            MatchDescription::Enum { .. }
        ));
        assert_eq!(r.resolve(status, named(&u, "b", "Other")), MatchDescription::NoMatch);
    }

    #[test]
    fn test_enum_against_non_enum_is_terminal() {
        let mut u = universe();
        let int = parse(&mut u, "int64");
        let status = named(&u, "a", "Status");
        let level = named(&u, "a", "Level");
        let mut r = Resolver::new(&u);

        // Level and Status share an underlying kind, Level has no constants.
        assert_eq!(r.resolve(status, level), MatchDescription::NoMatch);
        assert_eq!(r.resolve(status, int), MatchDescription::NoMatch);
        assert_eq!(r.resolve(level, int), MatchDescription::Castable);
    }

    #[test]
    fn test_strip_named_castable() {
        let u = universe();
        let mut r = Resolver::new(&u);
        // Named types over the same underlying int.
        assert_eq!(
            r.resolve(named(&u, "a", "Level"), named(&u, "a", "Count")),
            MatchDescription::Castable,
            "numeric family across widths"
        );
    }

    #[test]
    fn test_sequences() {
        let mut u = universe();
        let ints = parse(&mut u, "[]int");
        let floats = parse(&mut u, "[]*float32");
        let strings = parse(&mut u, "[]string");
        let int = parse(&mut u, "int");
        let mut r = Resolver::new(&u);

        assert_eq!(
            r.resolve(ints, floats),
            MatchDescription::Sequence {
                elem: Box::new(MatchDescription::Castable)
            }
        );
        assert_eq!(r.resolve(ints, strings), MatchDescription::NoMatch);
        assert_eq!(r.resolve(ints, int), MatchDescription::NoMatch);
    }

    #[test]
    fn test_named_sequence_is_direct_with_its_underlying() {
        let mut u = universe();
        let strings = parse(&mut u, "[]string");
        let names = named(&u, "a", "Names");
        let mut r = Resolver::new(&u);
        assert_eq!(r.resolve(names, strings), MatchDescription::Direct);
    }

    #[test]
    fn test_maps() {
        let mut u = universe();
        let s = parse(&mut u, "string");
        let i = parse(&mut u, "int");
        let f = parse(&mut u, "float64");
        let name = named(&u, "a", "Name");
        let m1 = u.map_of(name, i);
        let m2 = u.map_of(s, f);
        let m3 = u.map_of(i, f);
        let mut r = Resolver::new(&u);

        assert_eq!(
            r.resolve(m1, m2),
            MatchDescription::Map {
                key: Box::new(MatchDescription::Castable),
                elem: Box::new(MatchDescription::Castable),
            }
        );
        assert_eq!(r.resolve(m1, m3), MatchDescription::NoMatch);
    }

    #[test]
    fn test_self_referential_records_terminate() {
        let u = universe();
        let mut r = Resolver::new(&u);
        assert_eq!(
            r.resolve(named(&u, "a", "Node"), named(&u, "b", "Node")),
            MatchDescription::NoMatch
        );
    }

    #[test]
    fn test_string_and_int_do_not_match() {
        let mut u = universe();
        let s = parse(&mut u, "string");
        let i = parse(&mut u, "int");
        let mut r = Resolver::new(&u);
        assert_eq!(r.resolve(s, i), MatchDescription::NoMatch);
    }
}
