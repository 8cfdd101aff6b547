//! Error types for statement building, primary key handling and SQL screening.

/// SqlBuildError is raised synchronously, before any database round-trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SqlBuildError {
    #[error("invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("{0} requires at least one field")]
    EmptyFields(&'static str),

    #[error("refusing to build {0} without a WHERE condition")]
    EmptyWhere(&'static str),
}

/// PkError covers primary key conversion and generation.
///
/// Unlike ordinary column conversion, a primary key that does not parse is
/// never silently replaced with NULL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkError {
    #[error("value '{value}' cannot be converted to primary key type '{pk_type}'")]
    InvalidValue { pk_type: String, value: String },

    #[error("primary key type '{0}' is not supported")]
    UnsupportedType(String),
}

/// ReadOnlySqlError explains why a statement was rejected by the select-only check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadOnlySqlError {
    #[error("SQL statement is empty")]
    Empty,

    #[error("only SELECT statements are allowed")]
    NotSelect,

    #[error("SQL contains forbidden keyword: {0}")]
    ForbiddenKeyword(String),

    #[error("SQL comments are not allowed")]
    Comment,

    #[error("multiple statements are not allowed")]
    MultipleStatements,
}
