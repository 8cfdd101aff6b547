use std::sync::{Arc, LazyLock};

use k1s0_dynamic_sql::readonly::ensure_select_only;
use k1s0_dynamic_sql::{DbRow, SqlStatement};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::finish;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::entity::dropdown::{DropdownOption, FormFieldDropdown};
use crate::domain::error::FormError;
use crate::domain::value_object::FormControlType;
use crate::infrastructure::database::{Database, SqlExecutor};
use crate::infrastructure::persistence::{dropdown_store, field_config_store, form_master_store};

static FROM_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bFROM\s+([\[\]"\w.]+)"#).unwrap_or_else(|e| panic!("invalid FROM regex: {e}"))
});

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StaticOptionInput {
    pub value: String,
    pub text: String,
}

/// SQL の結果から得た (値, 表示文字列) の組。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionPreview {
    pub value: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DropdownView {
    pub dropdown: FormFieldDropdown,
    pub options: Vec<DropdownOption>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncResult {
    pub dropdown_id: Uuid,
    pub option_count: usize,
    pub options: Vec<DropdownOption>,
}

/// ManageDropdownsUseCase はドロップダウン項目の選択肢の出所と同期を扱う。
pub struct ManageDropdownsUseCase {
    db: Arc<dyn Database>,
}

impl ManageDropdownsUseCase {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Dropdown 項目のドロップダウン設定を返す。未作成なら静的リストとして作る。
    pub async fn get_or_create(
        &self,
        field_config_id: Uuid,
        user: &CurrentUser,
    ) -> Result<DropdownView, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let field = field_config_store::get(exec, field_config_id).await?;
            if field.control_type != FormControlType::Dropdown {
                return Err(FormError::validation(format!(
                    "column {} is not a dropdown field",
                    field.column_name
                )));
            }
            let dropdown = match dropdown_store::find_by_field(exec, field_config_id).await? {
                Some(dropdown) => dropdown,
                None => {
                    let dropdown = FormFieldDropdown {
                        id: Uuid::new_v4(),
                        form_field_config_id: field_config_id,
                        is_use_sql: false,
                        dropdown_sql: None,
                    };
                    dropdown_store::insert(exec, &dropdown, user.actor()).await?;
                    dropdown
                }
            };
            let options = dropdown_store::list_options(exec, dropdown.id).await?;
            Ok(DropdownView { dropdown, options })
        }
        .await;
        finish(uow, result).await
    }

    pub async fn list_options(
        &self,
        dropdown_id: Uuid,
        user: &CurrentUser,
    ) -> Result<Vec<DropdownOption>, FormError> {
        let mut conn = self.db.connection(user.actor()).await?;
        dropdown_store::get(conn.as_mut(), dropdown_id).await?;
        dropdown_store::list_options(conn.as_mut(), dropdown_id).await
    }

    /// 静的な選択肢で全置換し、SQL 同期を解除する。
    pub async fn replace_static_options(
        &self,
        dropdown_id: Uuid,
        options: &[StaticOptionInput],
        user: &CurrentUser,
    ) -> Result<Vec<DropdownOption>, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let mut dropdown = dropdown_store::get(exec, dropdown_id).await?;
            if dropdown.is_use_sql || dropdown.dropdown_sql.is_some() {
                dropdown.is_use_sql = false;
                dropdown.dropdown_sql = None;
                dropdown_store::update_source(exec, &dropdown, user.actor()).await?;
            }
            let pairs: Vec<OptionPreview> = options
                .iter()
                .map(|o| OptionPreview {
                    value: o.value.trim().to_string(),
                    text: o.text.trim().to_string(),
                })
                .collect();
            replace_options(exec, dropdown_id, &pairs, None, user.actor()).await
        }
        .await;
        finish(uow, result).await
    }

    /// SQL を実行して結果を返すだけで、何も保存しない。
    pub async fn preview_sql(
        &self,
        sql: &str,
        user: &CurrentUser,
    ) -> Result<Vec<OptionPreview>, FormError> {
        ensure_select_only(sql)?;
        let mut conn = self.db.connection(user.actor()).await?;
        let rows = conn.query(&SqlStatement::new(sql.trim())).await?;
        Ok(to_pairs(&rows))
    }

    /// 1 つのドロップダウンを同期する。`sql` 指定時はそれを保存してから実行する。
    pub async fn sync(
        &self,
        dropdown_id: Uuid,
        sql: Option<&str>,
        user: &CurrentUser,
    ) -> Result<SyncResult, FormError> {
        if let Some(sql) = sql {
            ensure_select_only(sql)?;
        }
        let mut uow = self.db.begin(user.actor()).await?;
        let result = sync_in(uow.executor(), dropdown_id, sql, user.actor()).await;
        finish(uow, result).await
    }

    /// フォームの SQL 同期ドロップダウンをすべて 1 トランザクションで同期する。
    pub async fn sync_all(&self, form_id: Uuid, user: &CurrentUser) -> Result<Vec<SyncResult>, FormError> {
        let mut uow = self.db.begin(user.actor()).await?;
        let result = async {
            let exec = uow.executor();
            let master = form_master_store::get(exec, form_id).await?;
            let field_ids =
                field_config_store::ids_by_masters(exec, &form_master_store::owned_master_ids(&master)).await?;
            let dropdowns = dropdown_store::list_by_fields(exec, &field_ids).await?;
            let mut results = Vec::new();
            for dropdown in dropdowns.iter().filter(|d| d.is_use_sql) {
                results.push(sync_in(exec, dropdown.id, None, user.actor()).await?);
            }
            Ok(results)
        }
        .await;
        let results = finish(uow, result).await?;
        info!(form_master_id = %form_id, dropdowns = results.len(), "dropdowns synced");
        Ok(results)
    }
}

/// 呼び出し側の作業単位の中で同期する。
///
/// SQL は読み取り専用であることを何よりも先に確認し、拒否した場合は文を 1 つも実行しない。
/// 結果の先頭 2 列を (値, 表示文字列) とし、既存の選択肢を結果の順で全置換する。
pub(crate) async fn sync_in(
    exec: &mut dyn SqlExecutor,
    dropdown_id: Uuid,
    sql: Option<&str>,
    actor: &str,
) -> Result<SyncResult, FormError> {
    if let Some(sql) = sql {
        ensure_select_only(sql)?;
    }
    let mut dropdown = dropdown_store::get(exec, dropdown_id).await?;
    let sql = match sql {
        Some(sql) => sql.trim().to_string(),
        None => dropdown
            .dropdown_sql
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| FormError::validation(format!("dropdown '{dropdown_id}' has no source SQL")))?,
    };
    // 保存済みの SQL も実行前に再確認する
    ensure_select_only(&sql)?;

    if !dropdown.is_use_sql || dropdown.dropdown_sql.as_deref() != Some(sql.as_str()) {
        dropdown.is_use_sql = true;
        dropdown.dropdown_sql = Some(sql.clone());
        dropdown_store::update_source(exec, &dropdown, actor).await?;
    }

    let rows = exec.query(&SqlStatement::new(sql.as_str())).await?;
    let pairs = to_pairs(&rows);
    let options = replace_options(exec, dropdown_id, &pairs, source_table(&sql), actor).await?;
    info!(dropdown_id = %dropdown_id, options = options.len(), "dropdown options synced");
    Ok(SyncResult {
        dropdown_id,
        option_count: options.len(),
        options,
    })
}

async fn replace_options(
    exec: &mut dyn SqlExecutor,
    dropdown_id: Uuid,
    pairs: &[OptionPreview],
    option_table: Option<String>,
    actor: &str,
) -> Result<Vec<DropdownOption>, FormError> {
    dropdown_store::delete_options(exec, dropdown_id).await?;
    let mut options = Vec::with_capacity(pairs.len());
    for (i, pair) in pairs.iter().enumerate() {
        let option = DropdownOption {
            id: Uuid::new_v4(),
            form_field_dropdown_id: dropdown_id,
            option_table: option_table.clone(),
            option_value: pair.value.clone(),
            option_text: pair.text.clone(),
            option_order: i32::try_from(i + 1).unwrap_or(i32::MAX),
        };
        dropdown_store::insert_option(exec, &option, actor).await?;
        options.push(option);
    }
    Ok(options)
}

/// 先頭 2 列を (値, 表示文字列) として読む。値が NULL の行は捨てる。
/// 1 列しか無い場合は値をそのまま表示文字列にする。
fn to_pairs(rows: &[DbRow]) -> Vec<OptionPreview> {
    rows.iter()
        .filter_map(|row| {
            let value = row.get_index(0)?.as_text()?;
            let text = match row.get_index(1) {
                Some(v) => v.as_text().unwrap_or_default(),
                None => value.clone(),
            };
            Some(OptionPreview { value, text })
        })
        .collect()
}

fn source_table(sql: &str) -> Option<String> {
    let name = FROM_TABLE.captures(sql)?.get(1)?.as_str();
    let name = name.rsplit('.').next().unwrap_or(name);
    let name = name.trim_matches(|c| c == '[' || c == ']' || c == '"');
    (!name.is_empty()).then(|| name.to_string())
}
