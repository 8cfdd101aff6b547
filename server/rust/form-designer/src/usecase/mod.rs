pub mod form_data;
pub mod manage_delete_guards;
pub mod manage_dropdowns;
pub mod manage_field_configs;
pub mod manage_form_masters;
pub mod manage_validation_rules;
pub mod many_to_many;
pub mod master_detail;
pub mod orphan_cleanup;

#[cfg(test)]
pub(crate) mod test_support;

pub use form_data::FormDataUseCase;
pub use manage_delete_guards::ManageDeleteGuardsUseCase;
pub use manage_dropdowns::ManageDropdownsUseCase;
pub use manage_field_configs::ManageFieldConfigsUseCase;
pub use manage_form_masters::ManageFormMastersUseCase;
pub use manage_validation_rules::ManageValidationRulesUseCase;
pub use many_to_many::ManyToManyUseCase;
pub use master_detail::MasterDetailUseCase;
pub use orphan_cleanup::OrphanCleanupUseCase;

use tracing::warn;

use crate::domain::error::FormError;
use crate::domain::repository::SchemaRepository;
use crate::domain::service::TableSchema;
use crate::infrastructure::database::UnitOfWork;

/// `result` に応じてコミットまたはロールバックする。
/// ロールバックの失敗は記録するだけで、元のエラーを返す。
pub(crate) async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    result: Result<T, FormError>,
) -> Result<T, FormError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// 1 始まりのページ番号を OFFSET に変換する。OFFSET は bigint に収まる必要がある。
pub(crate) fn page_offset(page: u64, page_size: u64) -> Result<u64, FormError> {
    page.saturating_sub(1)
        .checked_mul(page_size)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| FormError::validation(format!("page {page} is out of range")))
}

/// テーブルの列情報を読み込む。列が無ければテーブルは存在しないとみなす。
pub(crate) async fn load_schema(
    schema_repo: &dyn SchemaRepository,
    table: &str,
) -> Result<TableSchema, FormError> {
    let columns = schema_repo.get_columns(table).await?;
    let schema = TableSchema::new(table, columns);
    if !schema.exists() {
        return Err(FormError::not_found("table", table));
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20).unwrap(), 0);
        assert_eq!(page_offset(3, 10).unwrap(), 20);
        assert!(matches!(page_offset(u64::MAX, 20), Err(FormError::Validation { .. })));
        // 乗算は収まるが bigint を超える
        assert!(page_offset((1 << 62) + 1, 2).is_err());
        assert_eq!(page_offset(1 << 62, 2).unwrap(), (1 << 63) - 2);
    }
}
