use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_object::{ConditionType, FormControlType, QueryComponentType};

/// FormFieldConfig はフォームに公開する 1 列の設定。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormFieldConfig {
    pub id: Uuid,
    pub form_field_master_id: Uuid,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub control_type: FormControlType,
    pub is_visible: bool,
    pub is_editable: bool,
    pub is_required: bool,
    pub query_enabled: bool,
    pub query_component: Option<QueryComponentType>,
    pub query_condition: Option<ConditionType>,
    pub display_name: Option<String>,
    pub field_order: i32,
    pub create_user: String,
    pub create_time: NaiveDateTime,
    pub edit_user: Option<String>,
    pub edit_time: Option<NaiveDateTime>,
}
