use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_object::{FormFieldStatus, FormFunctionType, TableSchemaQueryType};

/// FormFieldMaster は 1 つのフォーム定義（またはその役割別の下書き）を表す。
///
/// 下書きは役割（Table / Detail / View / Mapping）ごとに 1 行で、対応するテーブル名を持つ。
/// 確定済み（`All`）のマスタは `*_table_id` で各役割の下書きを参照する。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FormFieldMaster {
    pub id: Uuid,
    pub form_name: String,
    pub base_table_name: Option<String>,
    pub detail_table_name: Option<String>,
    pub view_table_name: Option<String>,
    pub mapping_table_name: Option<String>,
    pub base_table_id: Option<Uuid>,
    pub detail_table_id: Option<Uuid>,
    pub view_table_id: Option<Uuid>,
    pub mapping_table_id: Option<Uuid>,
    /// 多対多フォームで紐付け先となるテーブル。
    pub target_table_name: Option<String>,
    pub mapping_base_fk_column: Option<String>,
    pub mapping_target_fk_column: Option<String>,
    /// 明細テーブル側で親の主キーを保持する列。未設定時は列名サフィックスで推定する。
    pub detail_relation_column: Option<String>,
    pub function_type: FormFunctionType,
    pub status: FormFieldStatus,
    pub schema_type: TableSchemaQueryType,
    pub is_deleted: bool,
    pub create_user: String,
    pub create_time: NaiveDateTime,
    pub edit_user: Option<String>,
    pub edit_time: Option<NaiveDateTime>,
}

impl FormFieldMaster {
    pub fn new_draft(
        form_name: String,
        schema_type: TableSchemaQueryType,
        table_name: String,
        function_type: FormFunctionType,
        actor: &str,
        now: NaiveDateTime,
    ) -> Self {
        let mut master = Self {
            id: Uuid::new_v4(),
            form_name,
            base_table_name: None,
            detail_table_name: None,
            view_table_name: None,
            mapping_table_name: None,
            base_table_id: None,
            detail_table_id: None,
            view_table_id: None,
            mapping_table_id: None,
            target_table_name: None,
            mapping_base_fk_column: None,
            mapping_target_fk_column: None,
            detail_relation_column: None,
            function_type,
            status: FormFieldStatus::Draft,
            schema_type,
            is_deleted: false,
            create_user: actor.to_string(),
            create_time: now,
            edit_user: None,
            edit_time: None,
        };
        master.set_table(schema_type, table_name);
        master
    }

    pub fn is_finalized(&self) -> bool {
        self.schema_type == TableSchemaQueryType::All
    }

    /// 役割に対応するテーブル名。`All` は基本テーブルを返す。
    pub fn table_for(&self, role: TableSchemaQueryType) -> Option<&str> {
        match role {
            TableSchemaQueryType::Table | TableSchemaQueryType::All => self.base_table_name.as_deref(),
            TableSchemaQueryType::Detail => self.detail_table_name.as_deref(),
            TableSchemaQueryType::View => self.view_table_name.as_deref(),
            TableSchemaQueryType::Mapping => self.mapping_table_name.as_deref(),
        }
    }

    pub fn set_table(&mut self, role: TableSchemaQueryType, table_name: String) {
        match role {
            TableSchemaQueryType::Table | TableSchemaQueryType::All => {
                self.base_table_name = Some(table_name);
            }
            TableSchemaQueryType::Detail => self.detail_table_name = Some(table_name),
            TableSchemaQueryType::View => self.view_table_name = Some(table_name),
            TableSchemaQueryType::Mapping => self.mapping_table_name = Some(table_name),
        }
    }

    /// 役割別の項目設定を保持するマスタの ID。参照が無ければ自身。
    pub fn config_master_id(&self, role: TableSchemaQueryType) -> Uuid {
        let referenced = match role {
            TableSchemaQueryType::Table | TableSchemaQueryType::All => self.base_table_id,
            TableSchemaQueryType::Detail => self.detail_table_id,
            TableSchemaQueryType::View => self.view_table_id,
            TableSchemaQueryType::Mapping => self.mapping_table_id,
        };
        referenced.unwrap_or(self.id)
    }

    /// 検索に使うテーブル。ビューが設定されていればビュー。
    pub fn search_table(&self) -> Option<&str> {
        self.view_table_name
            .as_deref()
            .or(self.base_table_name.as_deref())
    }

    pub fn touch(&mut self, actor: &str, now: NaiveDateTime) {
        self.edit_user = Some(actor.to_string());
        self.edit_time = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc()
    }

    #[test]
    fn test_new_draft_sets_role_table() {
        let m = FormFieldMaster::new_draft(
            "orders".to_string(),
            TableSchemaQueryType::Detail,
            "ORDER_LINE".to_string(),
            FormFunctionType::MasterDetail,
            "alice",
            now(),
        );
        assert_eq!(m.detail_table_name.as_deref(), Some("ORDER_LINE"));
        assert!(m.base_table_name.is_none());
        assert_eq!(m.status, FormFieldStatus::Draft);
        assert!(!m.is_finalized());
    }

    #[test]
    fn test_config_master_id_falls_back_to_self() {
        let mut m = FormFieldMaster::new_draft(
            "orders".to_string(),
            TableSchemaQueryType::Table,
            "ORDERS".to_string(),
            FormFunctionType::MasterMaintenance,
            "alice",
            now(),
        );
        assert_eq!(m.config_master_id(TableSchemaQueryType::Table), m.id);
        let draft = Uuid::new_v4();
        m.base_table_id = Some(draft);
        assert_eq!(m.config_master_id(TableSchemaQueryType::All), draft);
    }

    #[test]
    fn test_search_table_prefers_view() {
        let mut m = FormFieldMaster::new_draft(
            "orders".to_string(),
            TableSchemaQueryType::Table,
            "ORDERS".to_string(),
            FormFunctionType::MasterMaintenance,
            "alice",
            now(),
        );
        assert_eq!(m.search_table(), Some("ORDERS"));
        m.view_table_name = Some("V_ORDERS".to_string());
        assert_eq!(m.search_table(), Some("V_ORDERS"));
    }
}
