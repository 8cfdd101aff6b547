use serde::Serialize;
use uuid::Uuid;

/// FormFieldDropdown はドロップダウン項目の選択肢の出所を表す。
/// `is_use_sql` が真の場合、選択肢は `dropdown_sql` の結果から同期される。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormFieldDropdown {
    pub id: Uuid,
    pub form_field_config_id: Uuid,
    pub is_use_sql: bool,
    pub dropdown_sql: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DropdownOption {
    pub id: Uuid,
    pub form_field_dropdown_id: Uuid,
    /// 同期元 SQL の FROM 句から取得したテーブル名。
    pub option_table: Option<String>,
    pub option_value: String,
    pub option_text: String,
    pub option_order: i32,
}
