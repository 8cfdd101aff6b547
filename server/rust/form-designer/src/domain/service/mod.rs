pub mod field_validator;
pub mod table_schema;

pub use field_validator::{check_rule_value, FieldValidator};
pub use table_schema::{TableSchema, WriteMode};
