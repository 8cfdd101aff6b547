use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

/// ConditionType は検索条件の比較方法を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    Equal,
    NotEqual,
    Like,
    Between,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl ConditionType {
    /// 値を 2 つ（From / To）取る条件。
    pub fn is_range(self) -> bool {
        self == ConditionType::Between
    }
}

impl Described for ConditionType {
    const TYPE_NAME: &'static str = "ConditionType";

    fn all() -> &'static [Self] {
        &[
            ConditionType::Equal,
            ConditionType::NotEqual,
            ConditionType::Like,
            ConditionType::Between,
            ConditionType::GreaterThanOrEqual,
            ConditionType::LessThanOrEqual,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            ConditionType::Equal => EnumDescriptor::new(0, "Equal", "Equals", "Exact match"),
            ConditionType::NotEqual => EnumDescriptor::new(1, "NotEqual", "Not equal", "Excludes the value"),
            ConditionType::Like => EnumDescriptor::new(2, "Like", "Contains", "Partial text match"),
            ConditionType::Between => EnumDescriptor::new(3, "Between", "Between", "Inclusive range"),
            ConditionType::GreaterThanOrEqual => {
                EnumDescriptor::new(4, "GreaterThanOrEqual", "From", "Greater than or equal")
            }
            ConditionType::LessThanOrEqual => {
                EnumDescriptor::new(5, "LessThanOrEqual", "To", "Less than or equal")
            }
        }
    }
}
