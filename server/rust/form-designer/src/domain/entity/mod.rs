pub mod column_info;
pub mod current_user;
pub mod delete_guard;
pub mod dropdown;
pub mod form_field_config;
pub mod form_field_master;
pub mod sql_log;
pub mod validation_rule;
