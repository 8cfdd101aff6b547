use chrono::{DateTime, Utc};
use uuid::Uuid;

/// SqlLogEntry は実行した SQL 1 件の記録。追記のみで更新しない。
#[derive(Debug, Clone, PartialEq)]
pub struct SqlLogEntry {
    pub id: Uuid,
    pub sql_text: String,
    pub parameters: serde_json::Value,
    pub duration_ms: i64,
    pub affected_rows: Option<i64>,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub actor: String,
    pub executed_at: DateTime<Utc>,
}
