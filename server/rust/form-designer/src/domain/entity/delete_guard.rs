use serde::Serialize;
use uuid::Uuid;

/// FormDeleteGuard は削除前に評価する SQL。結果が真なら削除を拒否する。
///
/// SQL は削除対象行の各列を `@列名` として参照できる。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormDeleteGuard {
    pub id: Uuid,
    pub form_field_master_id: Uuid,
    pub guard_sql: String,
    pub error_message: String,
    pub rule_order: i32,
    pub is_enabled: bool,
}
