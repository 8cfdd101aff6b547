//! Fixtures shared by the usecase tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::entity::column_info::ColumnInfo;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::form_field_config::FormFieldConfig;
use crate::domain::entity::form_field_master::FormFieldMaster;
use crate::domain::repository::schema_repository::MockSchemaRepository;
use crate::domain::value_object::{FormControlType, FormFunctionType, TableSchemaQueryType};
use crate::infrastructure::database::scripted::ScriptedDatabase;

pub fn user() -> CurrentUser {
    CurrentUser {
        user_id: "alice".to_string(),
        user_name: "Alice".to_string(),
    }
}

pub fn ts() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .unwrap()
        .naive_utc()
}

pub fn col(name: &str, data_type: &str, pk: bool, identity: bool) -> ColumnInfo {
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

/// 指定テーブルの列だけを返す SchemaRepository。未登録のテーブルは列なし。
pub fn schema_repo(tables: Vec<(&str, Vec<ColumnInfo>)>) -> MockSchemaRepository {
    let tables: HashMap<String, Vec<ColumnInfo>> = tables
        .into_iter()
        .map(|(name, columns)| (name.to_ascii_uppercase(), columns))
        .collect();
    let mut mock = MockSchemaRepository::new();
    mock.expect_get_columns()
        .returning(move |table| Ok(tables.get(&table.to_ascii_uppercase()).cloned().unwrap_or_default()));
    mock
}

pub fn finalized_master(
    function_type: FormFunctionType,
    base: &str,
    detail: Option<&str>,
    mapping: Option<&str>,
) -> FormFieldMaster {
    let mut m = FormFieldMaster::new_draft(
        "orders".to_string(),
        TableSchemaQueryType::All,
        base.to_string(),
        function_type,
        "alice",
        ts(),
    );
    m.detail_table_name = detail.map(str::to_string);
    m.mapping_table_name = mapping.map(str::to_string);
    m
}

pub fn config(master_id: Uuid, table: &str, column: &str, data_type: &str, control: FormControlType) -> FormFieldConfig {
    FormFieldConfig {
        id: Uuid::new_v4(),
        form_field_master_id: master_id,
        table_name: table.to_string(),
        column_name: column.to_string(),
        data_type: data_type.to_string(),
        control_type: control,
        is_visible: true,
        is_editable: true,
        is_required: false,
        query_enabled: false,
        query_component: None,
        query_condition: None,
        display_name: None,
        field_order: 0,
        create_user: "alice".to_string(),
        create_time: ts(),
        edit_user: None,
        edit_time: None,
    }
}

pub fn db() -> (ScriptedDatabase, Arc<ScriptedDatabase>) {
    let db = ScriptedDatabase::new();
    (db.clone(), Arc::new(db))
}
