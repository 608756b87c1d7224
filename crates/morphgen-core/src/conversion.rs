//! Conversion-routine discovery.
//!
//! Looks for user-written routines converting between two named types. A
//! usable pair needs a routine in each direction; a single direction is never
//! reported.

use serde::Serialize;

use crate::naming::is_exported;
use crate::types::{NamespaceId, Routine, TypeId, Universe};

/// How a conversion routine is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutineRef {
    /// Zero-parameter method on the source value.
    Method { name: String },
    /// Free function taking the source value.
    Function {
        #[serde(skip)]
        namespace: NamespaceId,
        name: String,
    },
}

impl RoutineRef {
    pub fn name(&self) -> &str {
        match self {
            RoutineRef::Method { name } | RoutineRef::Function { name, .. } => name,
        }
    }
}

/// One discovered conversion direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    #[serde(flatten)]
    pub routine: RoutineRef,
    /// Declared parameter type, for free functions.
    #[serde(skip)]
    pub param: Option<TypeId>,
    /// First declared result.
    #[serde(skip)]
    pub result: TypeId,
    /// The routine also returns an error.
    pub fallible: bool,
}

/// Routines converting `from -> to` and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPair {
    pub to: Conversion,
    pub back: Conversion,
}

/// Find a conversion pair between `from` and `to`.
///
/// Forward (`from -> to`): an exported method on `from`, else a free function
/// in `from`'s namespace. Backward (`to -> from`): an exported method on `to`,
/// else a free function in `from`'s namespace, else one in `to`'s namespace.
pub fn discover(universe: &Universe, from: TypeId, to: TypeId) -> Option<ConversionPair> {
    let (from_ns, _) = universe.named_parts(from)?;

    let to_conv = find_method(universe, from, to)
        .or_else(|| find_function(universe, from_ns, from, to))?;

    let back = find_method(universe, to, from)
        .or_else(|| find_function(universe, from_ns, to, from))
        .or_else(|| {
            let (to_ns, _) = universe.named_parts(to)?;
            find_function(universe, to_ns, to, from)
        })?;

    tracing::debug!(
        from = %universe.display(from),
        to = %universe.display(to),
        forward = to_conv.routine.name(),
        backward = back.routine.name(),
        "conversion routines found"
    );
    Some(ConversionPair { to: to_conv, back })
}

fn find_method(universe: &Universe, from: TypeId, to: TypeId) -> Option<Conversion> {
    if !universe.is_named(from) {
        return None;
    }
    universe
        .methods(from)
        .iter()
        .filter(|m| is_exported(&m.name) && m.params.is_empty())
        .find_map(|m| {
            let (result, fallible) = conversion_result(universe, m, to)?;
            Some(Conversion {
                routine: RoutineRef::Method {
                    name: m.name.clone(),
                },
                param: None,
                result,
                fallible,
            })
        })
}

fn find_function(
    universe: &Universe,
    namespace: NamespaceId,
    from: TypeId,
    to: TypeId,
) -> Option<Conversion> {
    universe
        .namespace(namespace)
        .functions
        .iter()
        .filter(|f| f.exported() && f.params.len() == 1)
        .find_map(|f| {
            let param = f.params[0];
            if !accepts(universe, param, from) {
                return None;
            }
            let (result, fallible) = conversion_result(universe, f, to)?;
            Some(Conversion {
                routine: RoutineRef::Function {
                    namespace,
                    name: f.name.clone(),
                },
                param: Some(param),
                result,
                fallible,
            })
        })
}

/// The parameter takes `from` directly or through one pointer.
fn accepts(universe: &Universe, param: TypeId, from: TypeId) -> bool {
    universe.assignable(from, param)
        || universe
            .pointer_elem(param)
            .is_some_and(|elem| universe.assignable(from, elem))
}

/// One result producing `to`, optionally followed by an `error`.
fn conversion_result(universe: &Universe, routine: &Routine, to: TypeId) -> Option<(TypeId, bool)> {
    let (result, fallible) = match routine.results.as_slice() {
        [result] => (*result, false),
        [result, err] if universe.is_error(*err) => (*result, true),
        _ => return None,
    };

    let produces = match universe.pointer_elem(result) {
        Some(elem) => elem == to,
        None => universe.assignable(result, to),
    };
    produces.then_some((result, fallible))
}
