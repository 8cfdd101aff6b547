use serde::Serialize;

/// ColumnInfo はカタログから取得した列情報。`data_type` は SQL Server 形式に正規化済み。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub max_length: Option<i32>,
    pub ordinal: i32,
    pub is_primary_key: bool,
    pub is_identity: bool,
}
