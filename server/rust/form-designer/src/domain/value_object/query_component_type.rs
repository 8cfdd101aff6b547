use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryComponentType {
    Input,
    Select,
    DatePicker,
    DateRange,
    NumberRange,
    Checkbox,
}

impl Described for QueryComponentType {
    const TYPE_NAME: &'static str = "QueryComponentType";

    fn all() -> &'static [Self] {
        &[
            QueryComponentType::Input,
            QueryComponentType::Select,
            QueryComponentType::DatePicker,
            QueryComponentType::DateRange,
            QueryComponentType::NumberRange,
            QueryComponentType::Checkbox,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            QueryComponentType::Input => EnumDescriptor::new(0, "Input", "Input", "Free text"),
            QueryComponentType::Select => EnumDescriptor::new(1, "Select", "Select", "Option list"),
            QueryComponentType::DatePicker => EnumDescriptor::new(2, "DatePicker", "Date", "Single date"),
            QueryComponentType::DateRange => EnumDescriptor::new(3, "DateRange", "Date range", "From / to dates"),
            QueryComponentType::NumberRange => {
                EnumDescriptor::new(4, "NumberRange", "Number range", "From / to numbers")
            }
            QueryComponentType::Checkbox => EnumDescriptor::new(5, "Checkbox", "Checkbox", "Boolean filter"),
        }
    }
}
