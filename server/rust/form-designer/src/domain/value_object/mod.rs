pub mod condition_type;
pub mod form_control_type;
pub mod form_field_status;
pub mod form_function_type;
pub mod query_component_type;
pub mod table_schema_query_type;
pub mod validation_type;

pub use condition_type::ConditionType;
pub use form_control_type::{
    allowed_validation_types, control_type_whitelist, is_control_allowed, FormControlType,
};
pub use form_field_status::FormFieldStatus;
pub use form_function_type::FormFunctionType;
pub use query_component_type::QueryComponentType;
pub use table_schema_query_type::TableSchemaQueryType;
pub use validation_type::ValidationType;
