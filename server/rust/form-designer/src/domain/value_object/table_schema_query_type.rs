use k1s0_server_common::{Described, EnumDescriptor};
use serde::{Deserialize, Serialize};

/// TableSchemaQueryType はマスタ行が担うテーブルの役割を表す。
/// `All` は確定済みのフォームで、役割ごとの下書きマスタを参照する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableSchemaQueryType {
    Table,
    Detail,
    View,
    Mapping,
    All,
}

impl Described for TableSchemaQueryType {
    const TYPE_NAME: &'static str = "TableSchemaQueryType";

    fn all() -> &'static [Self] {
        &[
            TableSchemaQueryType::Table,
            TableSchemaQueryType::Detail,
            TableSchemaQueryType::View,
            TableSchemaQueryType::Mapping,
            TableSchemaQueryType::All,
        ]
    }

    fn descriptor(self) -> EnumDescriptor {
        match self {
            TableSchemaQueryType::Table => EnumDescriptor::new(0, "Table", "Base table", "Main table of a form"),
            TableSchemaQueryType::Detail => EnumDescriptor::new(1, "Detail", "Detail table", "Child rows of a master"),
            TableSchemaQueryType::View => EnumDescriptor::new(2, "View", "View", "Read model used for searching"),
            TableSchemaQueryType::Mapping => {
                EnumDescriptor::new(3, "Mapping", "Mapping table", "Link table of a many-to-many form")
            }
            TableSchemaQueryType::All => EnumDescriptor::new(4, "All", "Finalized", "Complete form definition"),
        }
    }
}
