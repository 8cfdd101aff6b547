//! Identifier safety.
//!
//! Table and column names cannot be bound as parameters, so every name that
//! reaches generated SQL text goes through [`safe_ident`].

use crate::error::SqlBuildError;

/// Returns true when `name` consists only of ASCII letters, digits and `_`.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Wraps a validated identifier in brackets: `Users` -> `[Users]`.
pub fn safe_ident(name: &str) -> Result<String, SqlBuildError> {
    if !is_valid_identifier(name) {
        return Err(SqlBuildError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("[{name}]"))
}
