//! Boundary validation helpers

use super::types::{Error, Result};

/// Functional validation utilities
pub struct Validate;

impl Validate {
    /// Validate that a string is neither empty nor whitespace
    pub fn not_blank(value: &str, field: &'static str) -> Result<()> {
        if value.trim().is_empty() {
            Err(Error::validation(field, "must not be blank"))
        } else {
            Ok(())
        }
    }

    /// Validate using a custom predicate
    pub fn with_predicate<T, F>(
        value: T,
        predicate: F,
        field: &'static str,
        message: &str,
    ) -> Result<T>
    where
        F: FnOnce(&T) -> bool,
    {
        if predicate(&value) {
            Ok(value)
        } else {
            Err(Error::validation(field, message))
        }
    }
}
