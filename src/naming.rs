// src/naming.rs

//! Deterministic physical names for structural entities.
//!
//! Pure functions mapping logical names to physical identifiers. Inputs are
//! expected to already be validated identifiers; use [`validate_identifier`]
//! at the boundary (DDL interpreter, public schema-mutation calls) before
//! handing a name to any of these.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap())
}

/// Validates that `name` is a letter-led, alphanumeric-plus-underscore
/// identifier. Returns `InvalidName` otherwise.
pub fn validate_identifier(name: &str) -> Result<()> {
    if identifier_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// Physical name of a class's versioned data table.
pub fn data_table_name(class_name: &str) -> String {
    format!("data_{class_name}")
}

/// Physical name of a reference's versioned edge table.
pub fn reference_table_name(reference_name: &str) -> String {
    format!("reference_{reference_name}")
}

/// Physical name of a secondary index on `class_name.attr_name`.
pub fn index_name(class_name: &str, attr_name: &str) -> String {
    format!("idx_{class_name}_{attr_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers_pass() {
        assert!(validate_identifier("Person").is_ok());
        assert!(validate_identifier("first_name").is_ok());
        assert!(validate_identifier("a1").is_ok());
    }

    #[test]
    fn invalid_identifiers_fail() {
        assert!(validate_identifier("1name").is_err());
        assert!(validate_identifier("first-name").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has space").is_err());
    }

    #[test]
    fn physical_names_follow_convention() {
        assert_eq!(data_table_name("Person"), "data_Person");
        assert_eq!(reference_table_name("lives_at"), "reference_lives_at");
        assert_eq!(index_name("Person", "birthday"), "idx_Person_birthday");
    }
}
