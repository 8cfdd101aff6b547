use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_object::ValidationType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormFieldValidationRule {
    pub id: Uuid,
    pub field_config_id: Uuid,
    pub validation_type: ValidationType,
    pub validation_value: Option<String>,
    pub message_zh: Option<String>,
    pub message_en: Option<String>,
    pub validation_order: i32,
}

impl FormFieldValidationRule {
    /// 英語メッセージ、中国語メッセージ、既定文言の順に採用する。
    pub fn message(&self, field: &str) -> String {
        self.message_en
            .clone()
            .or_else(|| self.message_zh.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{field} failed {:?} check ({})",
                    self.validation_type,
                    self.validation_value.as_deref().unwrap_or_default()
                )
            })
    }
}
