//! Type mapping between PostgreSQL and Redshift.

use std::collections::{HashMap, HashSet};

/// Built-in PostgreSQL → Redshift type mappings.
const BUILTIN_MAPPINGS: &[(&str, &str)] = &[
    ("jsonb", "varchar"),
    ("text", "varchar"),
    ("int8", "bigint"),
    ("int4", "integer"),
    ("uuid", "char"),
    ("numeric", "decimal"),
];

/// Built-in Redshift types that never take a length argument.
const BUILTIN_NO_LENGTH: &[&str] = &["timestamptz", "bool", "bigint", "integer", "decimal"];

/// Immutable source → target type table plus the set of target types that
/// render without a length clause.
///
/// Types absent from the table pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    mappings: HashMap<String, String>,
    no_length: HashSet<String>,
}

impl TypeMapping {
    /// An empty mapping: every type passes through and takes a length.
    pub fn empty() -> Self {
        Self {
            mappings: HashMap::new(),
            no_length: HashSet::new(),
        }
    }

    /// The built-in PostgreSQL → Redshift mapping.
    pub fn builtin() -> Self {
        let mut mapping = Self::empty();
        for (source_type, target_type) in BUILTIN_MAPPINGS {
            mapping = mapping.with_mapping(*source_type, *target_type);
        }
        for target_type in BUILTIN_NO_LENGTH {
            mapping = mapping.with_no_length(*target_type);
        }
        mapping
    }

    /// Add or replace a source → target mapping.
    pub fn with_mapping(
        mut self,
        source_type: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        self.mappings.insert(source_type.into(), target_type.into());
        self
    }

    /// Mark a target type as length-free.
    pub fn with_no_length(mut self, target_type: impl AsRef<str>) -> Self {
        self.no_length.insert(target_type.as_ref().to_lowercase());
        self
    }

    /// Target type for a source type, or the source type itself when unmapped.
    pub fn resolve_target_type<'a>(&'a self, source_type: &'a str) -> &'a str {
        self.mappings
            .get(source_type)
            .map(String::as_str)
            .unwrap_or(source_type)
    }

    /// Whether a target type takes a length argument. Case-insensitive.
    pub fn requires_length(&self, target_type: &str) -> bool {
        !self.no_length.contains(&target_type.to_lowercase())
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_mappings() {
        let m = TypeMapping::builtin();
        assert_eq!(m.resolve_target_type("jsonb"), "varchar");
        assert_eq!(m.resolve_target_type("text"), "varchar");
        assert_eq!(m.resolve_target_type("int8"), "bigint");
        assert_eq!(m.resolve_target_type("int4"), "integer");
        assert_eq!(m.resolve_target_type("uuid"), "char");
        assert_eq!(m.resolve_target_type("numeric"), "decimal");
    }

    #[test]
    fn test_unmapped_types_pass_through() {
        let m = TypeMapping::builtin();
        assert_eq!(m.resolve_target_type("char"), "char");
        assert_eq!(m.resolve_target_type("timestamptz"), "timestamptz");
        assert_eq!(m.resolve_target_type("my_enum"), "my_enum");
        assert_eq!(m.resolve_target_type(""), "");
    }

    #[test]
    fn test_requires_length() {
        let m = TypeMapping::builtin();
        for t in ["timestamptz", "bool", "bigint", "integer", "decimal"] {
            assert!(!m.requires_length(t), "{} should be length-free", t);
        }
        assert!(m.requires_length("varchar"));
        assert!(m.requires_length("char"));
    }

    #[test]
    fn test_requires_length_is_case_insensitive() {
        let m = TypeMapping::builtin();
        assert!(!m.requires_length("BIGINT"));
        assert!(!m.requires_length("TimestampTz"));
        let custom = TypeMapping::empty().with_no_length("SUPER");
        assert!(!custom.requires_length("super"));
    }

    #[test]
    fn test_custom_mapping_does_not_touch_builtin() {
        let custom = TypeMapping::empty().with_mapping("jsonb", "super");
        assert_eq!(custom.resolve_target_type("jsonb"), "super");
        assert_eq!(custom.resolve_target_type("int8"), "int8");
        assert_eq!(TypeMapping::builtin().resolve_target_type("jsonb"), "varchar");
    }

    #[test]
    fn test_resolve_is_total_over_inputs() {
        let m = TypeMapping::builtin();
        for t in ["int2", "float8", "date", "bytea", "VARCHAR", "weird type"] {
            assert!(!m.resolve_target_type(t).is_empty());
        }
    }
}
