pub mod permission_repository;
pub mod schema_repository;
pub mod sql_log_repository;

pub use permission_repository::PermissionRepository;
pub use schema_repository::SchemaRepository;
pub use sql_log_repository::SqlLogRepository;
