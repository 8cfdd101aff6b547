//! Return codes carried in the `Code` field of every response.

use crate::descriptor::{Described, EnumDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Success,
    Fail,
    NotFound,
    ValidationError,
    DataAlreadyExists,
    DeleteBlocked,
    InvalidSql,
    InvalidIdentifier,
    UnsupportedType,
    Unauthorized,
    Forbidden,
    DatabaseError,
    UnhandledException,
}

impl ReturnCode {
    /// Default HTTP status for the code.
    pub fn http_status(self) -> u16 {
        match self {
            ReturnCode::Success => 200,
            ReturnCode::NotFound => 404,
            ReturnCode::Fail
            | ReturnCode::ValidationError
            | ReturnCode::InvalidSql
            | ReturnCode::InvalidIdentifier
            | ReturnCode::UnsupportedType => 400,
            ReturnCode::DataAlreadyExists | ReturnCode::DeleteBlocked => 409,
            ReturnCode::Unauthorized => 401,
            ReturnCode::Forbidden => 403,
            ReturnCode::DatabaseError | ReturnCode::UnhandledException => 500,
        }
    }
}

impl Described for ReturnCode {
    const TYPE_NAME: &'static str = "ReturnCode";

    fn all() -> &'static [Self] {
        &[
            ReturnCode::Success,
            ReturnCode::Fail,
            ReturnCode::NotFound,
            ReturnCode::ValidationError,
            ReturnCode::DataAlreadyExists,
            ReturnCode::DeleteBlocked,
            ReturnCode::InvalidSql,
            ReturnCode::InvalidIdentifier,
            ReturnCode::UnsupportedType,
            ReturnCode::Unauthorized,
            ReturnCode::Forbidden,
            ReturnCode::DatabaseError,
            ReturnCode::UnhandledException,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            ReturnCode::Success => EnumDescriptor::new(0, "Success", "Success", "Operation completed"),
            ReturnCode::Fail => EnumDescriptor::new(1, "Fail", "Operation failed", "Generic failure"),
            ReturnCode::NotFound => {
                EnumDescriptor::new(2, "NotFound", "Data not found", "The requested record does not exist")
            }
            ReturnCode::ValidationError => EnumDescriptor::new(
                3,
                "ValidationError",
                "Validation failed",
                "Input failed a field or rule check",
            ),
            ReturnCode::DataAlreadyExists => EnumDescriptor::new(
                4,
                "DataAlreadyExists",
                "Data already exists",
                "A record with the same key already exists",
            ),
            ReturnCode::DeleteBlocked => EnumDescriptor::new(
                5,
                "DeleteBlocked",
                "Delete is not allowed",
                "A delete guard rejected the operation",
            ),
            ReturnCode::InvalidSql => EnumDescriptor::new(
                6,
                "InvalidSql",
                "SQL is not allowed",
                "Only single read-only SELECT statements are accepted",
            ),
            ReturnCode::InvalidIdentifier => EnumDescriptor::new(
                7,
                "InvalidIdentifier",
                "Invalid table or column name",
                "Identifiers may contain letters, digits and underscores only",
            ),
            ReturnCode::UnsupportedType => EnumDescriptor::new(
                8,
                "UnsupportedType",
                "Unsupported data type",
                "The column or key type is not supported",
            ),
            ReturnCode::Unauthorized => {
                EnumDescriptor::new(401, "Unauthorized", "Not signed in", "Missing or invalid token")
            }
            ReturnCode::Forbidden => EnumDescriptor::new(
                403,
                "Forbidden",
                "Permission denied",
                "The user lacks the required action permission",
            ),
            ReturnCode::DatabaseError => {
                EnumDescriptor::new(900, "DatabaseError", "Database error", "The database rejected a statement")
            }
            ReturnCode::UnhandledException => EnumDescriptor::new(
                999,
                "UnhandledException",
                "Unexpected error",
                "An unexpected server error occurred",
            ),
        }
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
