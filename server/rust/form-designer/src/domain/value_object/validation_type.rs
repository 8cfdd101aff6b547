use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationType {
    Min,
    Max,
    MinLength,
    MaxLength,
    Regex,
    Email,
}

impl ValidationType {
    /// 値が数値でなければならないルール。
    pub fn needs_number(self) -> bool {
        matches!(self, ValidationType::Min | ValidationType::Max)
    }

    /// 値が 0 以上の整数でなければならないルール。
    pub fn needs_length(self) -> bool {
        matches!(self, ValidationType::MinLength | ValidationType::MaxLength)
    }
}

impl Described for ValidationType {
    const TYPE_NAME: &'static str = "ValidationType";

    fn all() -> &'static [Self] {
        &[
            ValidationType::Min,
            ValidationType::Max,
            ValidationType::MinLength,
            ValidationType::MaxLength,
            ValidationType::Regex,
            ValidationType::Email,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            ValidationType::Min => EnumDescriptor::new(0, "Min", "Minimum value", "Value must be at least the rule value"),
            ValidationType::Max => EnumDescriptor::new(1, "Max", "Maximum value", "Value must be at most the rule value"),
            ValidationType::MinLength => {
                EnumDescriptor::new(2, "MinLength", "Minimum length", "Text must have at least N characters")
            }
            ValidationType::MaxLength => {
                EnumDescriptor::new(3, "MaxLength", "Maximum length", "Text must have at most N characters")
            }
            ValidationType::Regex => EnumDescriptor::new(4, "Regex", "Pattern", "Text must match a regular expression"),
            ValidationType::Email => EnumDescriptor::new(5, "Email", "E-mail", "Text must be an e-mail address"),
        }
    }
}
