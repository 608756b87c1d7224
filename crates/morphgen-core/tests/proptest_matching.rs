//! Property-based tests for field-name normalization and zero elision.
//!
//! Invariants:
//! - normalization is idempotent and ignores the case/delimiter style a name
//!   is written in, so `user_id`, `UserId` and `user-id` always meet;
//! - a value field converted into a pointer field of the same basic type is
//!   only addressed when it differs from its zero value.

use morphgen_core::naming::normalize;
use morphgen_core::{generate, GenerateRequest, MatchDescription, SchemaRef, Universe};
use proptest::prelude::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Lower-case words forming an identifier. Single letters would read as an
/// acronym once camel-cased.
fn arb_words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{2,6}", 1..4)
}

fn snake(words: &[String]) -> String {
    words.join("_")
}

fn kebab(words: &[String]) -> String {
    words.join("-")
}

fn camel(words: &[String]) -> String {
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Basic kinds with a literal zero value.
fn arb_basic() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop_oneof![
        Just(("int", "0")),
        Just(("int8", "0")),
        Just(("int32", "0")),
        Just(("uint64", "0")),
        Just(("float32", "0")),
        Just(("float64", "0")),
        Just(("string", "\"\"")),
        Just(("bool", "false")),
    ]
}

fn universe(field: &str, primary_ty: &str, secondary_ty: &str) -> Universe {
    Universe::from_value(json!({
        "namespaces": [
            {"path": "example.com/a", "types": [
                {"name": "Rec", "file": "a/rec.go", "fields": [{"name": field, "type": primary_ty}]}
            ]},
            {"path": "example.com/b", "types": [
                {"name": "Rec", "fields": [{"name": field, "type": secondary_ty}]}
            ]}
        ]
    }))
    .unwrap()
}

fn request() -> GenerateRequest {
    GenerateRequest::new(
        SchemaRef::new("example.com/a", "Rec"),
        SchemaRef::new("example.com/b", "Rec"),
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn normalize_is_idempotent(name in "[A-Za-z][A-Za-z0-9_]{0,12}") {
        let once = normalize(&name);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn normalize_ignores_naming_style(words in arb_words()) {
        let expected = normalize(&snake(&words));
        prop_assert_eq!(normalize(&camel(&words)), expected.clone());
        prop_assert_eq!(normalize(&kebab(&words)), expected);
    }

    #[test]
    fn value_into_pointer_is_guarded_by_zero((ty, zero) in arb_basic()) {
        let u = universe("Value", ty, &format!("*{ty}"));
        let generation = generate(&u, &request()).unwrap();
        prop_assert_eq!(
            &generation.correspondence.fields[0].description,
            &MatchDescription::Direct
        );

        let body = generation.synthesis.body_text();
        let guard = format!("\tif x.Value != {zero} {{\n\t\tres.Value = &x.Value\n\t}}\n");
        prop_assert!(body.contains(&guard), "missing zero guard in:\n{}", body);
    }

    #[test]
    fn pointer_into_pointer_is_never_elided((ty, zero) in arb_basic()) {
        let u = universe("Value", &format!("*{ty}"), &format!("*{ty}"));
        let generation = generate(&u, &request()).unwrap();
        let body = generation.synthesis.body_text();
        prop_assert!(body.contains("\tres.Value = x.Value\n"));
        let elided = format!("!= {zero}");
        prop_assert!(!body.contains(&elided));
    }
}
