use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::validation_rule::FormFieldValidationRule;
use crate::domain::error::FieldError;
use crate::domain::service::table_schema::WriteMode;
use crate::domain::value_object::ValidationType;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("invalid e-mail regex: {e}"))
});

/// 検証ルールの値そのものが妥当かを確認する。
pub fn check_rule_value(validation_type: ValidationType, value: Option<&str>) -> Result<(), String> {
    let value = value.map(str::trim).unwrap_or_default();
    match validation_type {
        ValidationType::Min | ValidationType::Max => value
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| format!("{validation_type:?} requires a numeric value, got '{value}'")),
        ValidationType::MinLength | ValidationType::MaxLength => value
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| format!("{validation_type:?} requires a non-negative integer, got '{value}'")),
        ValidationType::Regex => Regex::new(value)
            .map(|_| ())
            .map_err(|e| format!("invalid regular expression: {e}")),
        ValidationType::Email => Ok(()),
    }
}

/// FieldValidator は項目設定と検証ルールで入力行を検査する。
pub struct FieldValidator<'a> {
    configs: &'a [FormFieldConfig],
    rules: &'a HashMap<Uuid, Vec<FormFieldValidationRule>>,
}

impl<'a> FieldValidator<'a> {
    pub fn new(
        configs: &'a [FormFieldConfig],
        rules: &'a HashMap<Uuid, Vec<FormFieldValidationRule>>,
    ) -> Self {
        Self { configs, rules }
    }

    /// 違反をすべて集めて返す。更新時は送られてきた項目だけを検査する。
    pub fn validate(&self, data: &Map<String, Value>, mode: WriteMode) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for config in self.configs {
            let label = config
                .display_name
                .clone()
                .unwrap_or_else(|| config.column_name.clone());
            let value = lookup(data, &config.column_name);
            let text = value.and_then(as_text);

            if config.is_required && text.is_none() && (mode == WriteMode::Insert || value.is_some()) {
                errors.push(FieldError::new(&config.column_name, format!("{label} is required")));
                continue;
            }
            let Some(text) = text else {
                continue;
            };
            for rule in self.rules.get(&config.id).into_iter().flatten() {
                if !passes(rule, &text) {
                    errors.push(FieldError::new(&config.column_name, rule.message(&label)));
                }
            }
        }
        errors
    }
}

fn lookup<'v>(data: &'v Map<String, Value>, column: &str) -> Option<&'v Value> {
    data.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(column))
        .map(|(_, v)| v)
}

/// NULL と空文字は未入力として扱う。
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn passes(rule: &FormFieldValidationRule, text: &str) -> bool {
    let limit = rule.validation_value.as_deref().unwrap_or_default().trim();
    match rule.validation_type {
        ValidationType::Min | ValidationType::Max => {
            let (Ok(v), Ok(l)) = (text.trim().parse::<f64>(), limit.parse::<f64>()) else {
                return false;
            };
            if rule.validation_type == ValidationType::Min {
                v >= l
            } else {
                v <= l
            }
        }
        ValidationType::MinLength | ValidationType::MaxLength => {
            let Ok(l) = limit.parse::<usize>() else {
                return true;
            };
            let len = text.chars().count();
            if rule.validation_type == ValidationType::MinLength {
                len >= l
            } else {
                len <= l
            }
        }
        ValidationType::Regex => Regex::new(limit).map_or(true, |re| re.is_match(text)),
        ValidationType::Email => EMAIL.is_match(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::FormControlType;

    fn config(column: &str, required: bool) -> FormFieldConfig {
        FormFieldConfig {
            id: Uuid::new_v4(),
            form_field_master_id: Uuid::nil(),
            table_name: "T".to_string(),
            column_name: column.to_string(),
            data_type: "nvarchar".to_string(),
            control_type: FormControlType::Text,
            is_visible: true,
            is_editable: true,
            is_required: required,
            query_enabled: false,
            query_component: None,
            query_condition: None,
            display_name: None,
            field_order: 0,
            create_user: "t".to_string(),
            create_time: chrono::NaiveDateTime::default(),
            edit_user: None,
            edit_time: None,
        }
    }

    fn rule(field: Uuid, vt: ValidationType, value: &str) -> FormFieldValidationRule {
        FormFieldValidationRule {
            id: Uuid::new_v4(),
            field_config_id: field,
            validation_type: vt,
            validation_value: Some(value.to_string()),
            message_zh: None,
            message_en: Some(format!("{vt:?} failed")),
            validation_order: 0,
        }
    }

    #[test]
    fn test_required_on_insert_only_when_missing() {
        let configs = vec![config("NAME", true)];
        let rules = HashMap::new();
        let v = FieldValidator::new(&configs, &rules);

        let empty = serde_json::json!({}).as_object().cloned().unwrap();
        assert_eq!(v.validate(&empty, WriteMode::Insert).len(), 1);
        assert!(v.validate(&empty, WriteMode::Update).is_empty());

        let blank = serde_json::json!({"name": " "}).as_object().cloned().unwrap();
        assert_eq!(v.validate(&blank, WriteMode::Update)[0].field, "NAME");
    }

    #[test]
    fn test_rules_are_applied() {
        let configs = vec![config("QTY", false), config("CODE", false)];
        let mut rules = HashMap::new();
        rules.insert(
            configs[0].id,
            vec![rule(configs[0].id, ValidationType::Min, "1"), rule(configs[0].id, ValidationType::Max, "10")],
        );
        rules.insert(
            configs[1].id,
            vec![rule(configs[1].id, ValidationType::Regex, "^[A-Z]{3}$")],
        );
        let v = FieldValidator::new(&configs, &rules);

        let ok = serde_json::json!({"QTY": 5, "CODE": "ABC"}).as_object().cloned().unwrap();
        assert!(v.validate(&ok, WriteMode::Insert).is_empty());

        let bad = serde_json::json!({"QTY": "11", "CODE": "abcd"}).as_object().cloned().unwrap();
        let errors = v.validate(&bad, WriteMode::Insert);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "Max failed");
        assert_eq!(errors[1].message, "Regex failed");
    }

    #[test]
    fn test_check_rule_value() {
        assert!(check_rule_value(ValidationType::Min, Some("1.5")).is_ok());
        assert!(check_rule_value(ValidationType::Max, Some("x")).is_err());
        assert!(check_rule_value(ValidationType::MaxLength, Some("-1")).is_err());
        assert!(check_rule_value(ValidationType::Regex, Some("([a-z")).is_err());
        assert!(check_rule_value(ValidationType::Email, None).is_ok());
    }
}
