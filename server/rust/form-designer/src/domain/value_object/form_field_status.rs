use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormFieldStatus {
    Draft,
    Active,
    Disabled,
}

impl Described for FormFieldStatus {
    const TYPE_NAME: &'static str = "FormFieldStatus";

    fn all() -> &'static [Self] {
        &[FormFieldStatus::Draft, FormFieldStatus::Active, FormFieldStatus::Disabled]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            FormFieldStatus::Draft => EnumDescriptor::new(0, "Draft", "Draft", "Being designed, not yet usable"),
            FormFieldStatus::Active => EnumDescriptor::new(1, "Active", "Active", "Finalized and usable"),
            FormFieldStatus::Disabled => EnumDescriptor::new(2, "Disabled", "Disabled", "Temporarily unavailable"),
        }
    }
}
