use k1s0_dynamic_sql::types::{family, SqlTypeFamily};
use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

use super::validation_type::ValidationType;

/// FormControlType は項目に割り当てる入力コントロールの種類を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormControlType {
    Text,
    Number,
    Date,
    Checkbox,
    Textarea,
    Dropdown,
}

impl Described for FormControlType {
    const TYPE_NAME: &'static str = "FormControlType";

    fn all() -> &'static [Self] {
        &[
            FormControlType::Text,
            FormControlType::Number,
            FormControlType::Date,
            FormControlType::Checkbox,
            FormControlType::Textarea,
            FormControlType::Dropdown,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            FormControlType::Text => EnumDescriptor::new(0, "Text", "Text box", "Single-line text input"),
            FormControlType::Number => EnumDescriptor::new(1, "Number", "Number", "Numeric input"),
            FormControlType::Date => EnumDescriptor::new(2, "Date", "Date picker", "Date or date-time input"),
            FormControlType::Checkbox => EnumDescriptor::new(3, "Checkbox", "Checkbox", "Boolean toggle"),
            FormControlType::Textarea => {
                EnumDescriptor::new(4, "Textarea", "Text area", "Multi-line text input")
            }
            FormControlType::Dropdown => {
                EnumDescriptor::new(5, "Dropdown", "Dropdown", "Selection from a static or SQL-backed option list")
            }
        }
    }
}

/// データ型に割り当て可能なコントロール。先頭が既定値。
pub fn control_type_whitelist(data_type: &str) -> &'static [FormControlType] {
    use FormControlType::{Checkbox, Date, Dropdown, Number, Text, Textarea};
    match family(data_type) {
        SqlTypeFamily::Guid | SqlTypeFamily::Other => &[Text],
        SqlTypeFamily::Integer | SqlTypeFamily::Decimal | SqlTypeFamily::Float => {
            &[Number, Text, Dropdown]
        }
        SqlTypeFamily::Bit => &[Checkbox],
        SqlTypeFamily::Date | SqlTypeFamily::DateTime => &[Date, Text],
        SqlTypeFamily::Character => &[Text, Textarea, Dropdown],
        SqlTypeFamily::LongText => &[Textarea, Text],
    }
}

pub fn is_control_allowed(data_type: &str, control: FormControlType) -> bool {
    control_type_whitelist(data_type).contains(&control)
}

/// コントロール種別ごとに設定可能な検証ルール。Date / Checkbox / Dropdown は検証ルールを持たない。
pub fn allowed_validation_types(control: FormControlType) -> &'static [ValidationType] {
    use ValidationType::{Email, Max, MaxLength, Min, MinLength, Regex};
    match control {
        FormControlType::Text | FormControlType::Textarea => &[MinLength, MaxLength, Regex, Email],
        FormControlType::Number => &[Min, Max],
        FormControlType::Date | FormControlType::Checkbox | FormControlType::Dropdown => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_column_allows_checkbox_only() {
        assert_eq!(control_type_whitelist("bit"), &[FormControlType::Checkbox]);
        assert!(!is_control_allowed("bit", FormControlType::Text));
    }

    #[test]
    fn test_whitelist_ignores_length_suffix() {
        assert_eq!(control_type_whitelist("NVARCHAR(50)")[0], FormControlType::Text);
        assert!(is_control_allowed("decimal(18,2)", FormControlType::Dropdown));
        assert_eq!(control_type_whitelist("uniqueidentifier"), &[FormControlType::Text]);
    }

    #[test]
    fn test_checkbox_and_dropdown_have_no_rules() {
        assert!(allowed_validation_types(FormControlType::Checkbox).is_empty());
        assert!(allowed_validation_types(FormControlType::Dropdown).is_empty());
        assert!(allowed_validation_types(FormControlType::Number).contains(&ValidationType::Min));
    }

    #[test]
    fn test_descriptor_lookup() {
        assert_eq!(FormControlType::from_value(5), Some(FormControlType::Dropdown));
        assert_eq!(FormControlType::from_code("textarea"), Some(FormControlType::Textarea));
    }
}
