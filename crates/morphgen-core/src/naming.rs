//! Naming conventions shared by the matcher and the synthesizer.

use heck::{ToKebabCase, ToSnakeCase, ToUpperCamelCase};

/// Canonical form used to compare field names: case- and
/// delimiter-insensitive, so `UserID`, `user_id` and `user-id` all collapse to
/// `user_id`.
pub fn normalize(name: &str) -> String {
    name.to_snake_case()
}

/// Exported identifiers start with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Accessor generated on the secondary root for a union payload field.
pub fn getter_name(field: &str) -> String {
    format!("Get{}", field.to_upper_camel_case())
}

/// Type (and single method) name marking a union field of `record`.
pub fn union_marker(record: &str, field: &str) -> String {
    format!("is{record}_{field}")
}

/// Literal-to-name lookup table of an index-style enumeration.
pub fn enum_name_table(type_name: &str) -> String {
    format!("{type_name}_name")
}

/// Name-to-literal lookup table of an index-style enumeration.
pub fn enum_value_table(type_name: &str) -> String {
    format!("{type_name}_value")
}

/// Identifier-safe suffix built from a qualified type reference: `pb.User`
/// becomes `PbUser`.
pub fn qualifier(reference: &str) -> String {
    reference.replace('.', "_").to_upper_camel_case()
}

/// Tag key attached to structured conversion errors.
pub fn error_tag(field: &str) -> String {
    format!("invalid-{}", field.to_kebab_case())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_collapses_case_and_delimiters() {
        assert_eq!(normalize("UserID"), "user_id");
        assert_eq!(normalize("user_id"), "user_id");
        assert_eq!(normalize("user-id"), "user_id");
        assert_eq!(normalize("ID"), normalize("Id"));
        assert_ne!(normalize("UserID"), normalize("userid2"));
    }

    #[test]
    fn test_exported() {
        assert!(is_exported("Name"));
        assert!(!is_exported("name"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_conventions() {
        assert_eq!(getter_name("Created"), "GetCreated");
        assert_eq!(union_marker("Event", "Payload"), "isEvent_Payload");
        assert_eq!(enum_name_table("Status"), "Status_name");
        assert_eq!(enum_value_table("Status"), "Status_value");
        assert_eq!(qualifier("pb.User"), "PbUser");
        assert_eq!(qualifier("UserRecord"), "UserRecord");
        assert_eq!(error_tag("CreatedAt"), "invalid-created-at");
    }
}
