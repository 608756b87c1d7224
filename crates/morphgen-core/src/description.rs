//! Match descriptions: how one field type converts into another.

use std::fmt;

use serde::Serialize;

use crate::conversion::{Conversion, RoutineRef};
use crate::enums::EnumDescription;

/// Resolution strategy for a `(primary, secondary)` type pair.
///
/// Roles are relative: `forward` / `primary` refer to the side the pair was
/// resolved from. [`MatchDescription::reversed`] swaps them for the mirror
/// direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MatchDescription {
    NoMatch,
    Direct,
    Conversion {
        /// Converts the primary type into the secondary one.
        forward: Conversion,
        /// Converts the secondary type into the primary one.
        backward: Conversion,
    },
    Enum {
        primary: EnumDescription,
        secondary: EnumDescription,
    },
    Castable,
    Sequence {
        elem: Box<MatchDescription>,
    },
    Map {
        key: Box<MatchDescription>,
        elem: Box<MatchDescription>,
    },
}

impl MatchDescription {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchDescription::NoMatch)
    }

    /// The same description seen from the other side.
    pub fn reversed(&self) -> MatchDescription {
        match self {
            MatchDescription::NoMatch => MatchDescription::NoMatch,
            MatchDescription::Direct => MatchDescription::Direct,
            MatchDescription::Castable => MatchDescription::Castable,
            MatchDescription::Conversion { forward, backward } => MatchDescription::Conversion {
                forward: backward.clone(),
                backward: forward.clone(),
            },
            MatchDescription::Enum { primary, secondary } => MatchDescription::Enum {
                primary: secondary.clone(),
                secondary: primary.clone(),
            },
            MatchDescription::Sequence { elem } => MatchDescription::Sequence {
                elem: Box::new(elem.reversed()),
            },
            MatchDescription::Map { key, elem } => MatchDescription::Map {
                key: Box::new(key.reversed()),
                elem: Box::new(elem.reversed()),
            },
        }
    }
}

fn routine(conversion: &Conversion) -> String {
    match &conversion.routine {
        RoutineRef::Method { name } => format!("method {name}"),
        RoutineRef::Function { name, .. } => format!("function {name}"),
    }
}

impl fmt::Display for MatchDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchDescription::NoMatch => f.write_str("no match"),
            MatchDescription::Direct => f.write_str("same type"),
            MatchDescription::Conversion { forward, backward } => write!(
                f,
                "convert primary to secondary with {}, convert back with {}",
                routine(forward),
                routine(backward)
            ),
            MatchDescription::Enum { primary, .. } => {
                let values: Vec<String> = primary.values().iter().map(|v| v.to_string()).collect();
                write!(f, "enumeration with values {}", values.join(", "))
            }
            MatchDescription::Castable => f.write_str("assignable types"),
            MatchDescription::Sequence { elem } => write!(f, "slice match where value is {elem}"),
            MatchDescription::Map { key, elem } => write!(
                f,
                "map match where key is {key} and value is {elem}"
            ),
        }
    }
}
