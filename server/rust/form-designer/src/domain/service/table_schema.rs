use k1s0_dynamic_sql::{convert, convert_pk_type, generate_pk_value, Fields, ResolvedPk, SqlValue};
use serde_json::{Map, Value};

use crate::domain::entity::column_info::ColumnInfo;
use crate::domain::error::FormError;

/// 書き込み種別。更新では主キー列を SET に含めない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    Update,
}

/// TableSchema は 1 テーブル分の実行時列情報。
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    pub fn require_primary_key(&self) -> Result<&ColumnInfo, FormError> {
        self.primary_key().ok_or_else(|| {
            FormError::validation(format!("table '{}' has no primary key", self.table))
        })
    }

    /// 文字列の ID を主キー型に変換する。変換できない ID はエラー。
    pub fn resolve_pk(&self, raw_id: &str) -> Result<ResolvedPk, FormError> {
        let pk = self.require_primary_key()?;
        let value = convert_pk_type(raw_id, &pk.data_type)?;
        Ok(ResolvedPk {
            name: pk.name.clone(),
            sql_type: pk.data_type.clone(),
            value,
        })
    }

    /// 新規行の主キー値。自動採番列なら `None`。
    pub fn new_pk_value(&self) -> Result<Option<SqlValue>, FormError> {
        let pk = self.require_primary_key()?;
        if pk.is_identity {
            return Ok(None);
        }
        Ok(Some(generate_pk_value(&pk.data_type)?))
    }

    /// 入力を列型に従って変換する。未知の列と自動採番列は捨てる。
    pub fn to_fields(&self, data: &Map<String, Value>, mode: WriteMode) -> Fields {
        let mut fields = Fields::new();
        for (key, value) in data {
            let Some(column) = self.column(key) else {
                continue;
            };
            if column.is_identity || (mode == WriteMode::Update && column.is_primary_key) {
                continue;
            }
            fields.push(column.name.clone(), convert(&column.data_type, value));
        }
        fields
    }

    /// 明細テーブルで親を参照する列。
    ///
    /// `configured` が指定されていればその列のみ。そうでなければ `suffixes` の
    /// いずれかで終わり、親テーブルにも存在する列。
    pub fn relation_columns(
        &self,
        parent: &TableSchema,
        configured: Option<&str>,
        suffixes: &[String],
    ) -> Vec<String> {
        if let Some(name) = configured.filter(|n| !n.is_empty()) {
            return self
                .column(name)
                .map(|c| vec![c.name.clone()])
                .unwrap_or_default();
        }
        self.columns
            .iter()
            .filter(|c| !c.is_primary_key)
            .filter(|c| {
                let upper = c.name.to_ascii_uppercase();
                suffixes
                    .iter()
                    .any(|s| upper.ends_with(&s.to_ascii_uppercase()))
            })
            .filter(|c| parent.column(&c.name).is_some())
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, data_type: &str, pk: bool, identity: bool) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: !pk,
            max_length: None,
            ordinal: 0,
            is_primary_key: pk,
            is_identity: identity,
        }
    }

    #[test]
    fn test_resolve_pk_converts_by_declared_type() {
        let schema = TableSchema::new("USERS", vec![col("ID", "int", true, false)]);
        let pk = schema.resolve_pk("123").unwrap();
        assert_eq!(pk.name, "ID");
        assert_eq!(pk.value, SqlValue::Int(123));
        assert!(matches!(schema.resolve_pk("abc"), Err(FormError::Pk(_))));
    }

    #[test]
    fn test_resolve_pk_without_key_is_validation_error() {
        let schema = TableSchema::new("V_USERS", vec![col("NAME", "nvarchar", false, false)]);
        assert!(matches!(schema.resolve_pk("1"), Err(FormError::Validation { .. })));
    }

    #[test]
    fn test_to_fields_skips_identity_unknown_and_pk_on_update() {
        let schema = TableSchema::new(
            "ITEMS",
            vec![
                col("ID", "uniqueidentifier", true, false),
                col("SEQ", "int", false, true),
                col("QTY", "int", false, false),
                col("NAME", "nvarchar", false, false),
            ],
        );
        let data = serde_json::json!({
            "id": "6f1c2f1e-8d7a-4c1b-9a55-3b7f9d1e2a10",
            "Seq": 5,
            "qty": "7",
            "name": "bolt",
            "unknown": 1
        });
        let data = data.as_object().unwrap();

        let insert = schema.to_fields(data, WriteMode::Insert);
        assert_eq!(insert.names().collect::<Vec<_>>(), vec!["ID", "QTY", "NAME"]);
        assert_eq!(insert.get("QTY"), Some(&SqlValue::BigInt(7)));

        let update = schema.to_fields(data, WriteMode::Update);
        assert_eq!(update.names().collect::<Vec<_>>(), vec!["QTY", "NAME"]);
    }

    #[test]
    fn test_new_pk_value_for_identity_is_none() {
        let schema = TableSchema::new("T", vec![col("ID", "int", true, true)]);
        assert_eq!(schema.new_pk_value().unwrap(), None);
        let schema = TableSchema::new("T", vec![col("ID", "uniqueidentifier", true, false)]);
        assert!(matches!(schema.new_pk_value().unwrap(), Some(SqlValue::Guid(_))));
    }

    #[test]
    fn test_relation_columns_by_suffix() {
        let parent = TableSchema::new(
            "ORDER_HEAD",
            vec![col("ORDER_NO", "varchar", true, false), col("NAME", "nvarchar", false, false)],
        );
        let detail = TableSchema::new(
            "ORDER_LINE",
            vec![
                col("LINE_ID", "uniqueidentifier", true, false),
                col("ORDER_NO", "varchar", false, false),
                col("ITEM_NO", "varchar", false, false),
            ],
        );
        let suffixes = vec!["_NO".to_string()];
        assert_eq!(detail.relation_columns(&parent, None, &suffixes), vec!["ORDER_NO"]);
        assert_eq!(
            detail.relation_columns(&parent, Some("item_no"), &suffixes),
            vec!["ITEM_NO"]
        );
    }
}
