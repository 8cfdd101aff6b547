//! k1s0-dynamic-sql: metadata-driven SQL generation for the form designer.
//!
//! Statements are produced in a SQL Server-shaped canonical dialect
//! (`[Table]`/`[Column]` identifiers, named `@param` placeholders).
//! Identifiers are always validated before they are interpolated; values
//! are always bound through placeholders.
//!
//! The [`postgres`] module renders the canonical text for the PostgreSQL driver.

pub mod builder;
pub mod error;
pub mod ident;
pub mod pk;
pub mod postgres;
pub mod readonly;
pub mod row;
pub mod statement;
pub mod types;
pub mod value;
pub mod where_builder;

pub use builder::{
    build_delete, build_delete_where, build_exists, build_exists_where, build_insert,
    build_insert_returning, build_update, build_update_where, Fields, SelectBuilder,
};
pub use error::{PkError, ReadOnlySqlError, SqlBuildError};
pub use ident::{is_valid_identifier, safe_ident};
pub use pk::{convert_pk_type, generate_pk_value, generate_pk_value_at, ResolvedPk};
pub use row::DbRow;
pub use statement::{SqlParam, SqlStatement};
pub use value::{convert, SqlValue};
pub use where_builder::{CompareOp, WhereBuilder};
