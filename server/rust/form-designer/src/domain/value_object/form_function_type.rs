use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

/// FormFunctionType は画面の構成を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormFunctionType {
    MasterMaintenance,
    MasterDetail,
    MultipleMapping,
    TableValueFunction,
}

impl Described for FormFunctionType {
    const TYPE_NAME: &'static str = "FormFunctionType";

    fn all() -> &'static [Self] {
        &[
            FormFunctionType::MasterMaintenance,
            FormFunctionType::MasterDetail,
            FormFunctionType::MultipleMapping,
            FormFunctionType::TableValueFunction,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            FormFunctionType::MasterMaintenance => {
                EnumDescriptor::new(0, "MasterMaintenance", "Master maintenance", "Single table CRUD")
            }
            FormFunctionType::MasterDetail => {
                EnumDescriptor::new(1, "MasterDetail", "Master / detail", "Header row with child rows")
            }
            FormFunctionType::MultipleMapping => EnumDescriptor::new(
                2,
                "MultipleMapping",
                "Many-to-many",
                "Links between two tables through a mapping table",
            ),
            FormFunctionType::TableValueFunction => EnumDescriptor::new(
                3,
                "TableValueFunction",
                "Table-valued function",
                "Read-only query over a table-valued function",
            ),
        }
    }
}
