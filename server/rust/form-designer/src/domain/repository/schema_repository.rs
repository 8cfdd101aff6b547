use async_trait::async_trait;

use crate::domain::entity::column_info::ColumnInfo;
use crate::domain::value_object::TableSchemaQueryType;
use crate::infrastructure::database::DbError;

/// SchemaRepository はデータベースカタログを参照する。
/// 主キーを持たないテーブル（ビュー等）は正常な結果として空を返す。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    /// `pattern` に LIKE 一致するテーブル / ビュー / テーブル値関数の名前。
    async fn search_tables(
        &self,
        pattern: &str,
        query_type: TableSchemaQueryType,
    ) -> Result<Vec<String>, DbError>;

    /// 列を定義順に返す。存在しないテーブルは空。
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError>;

    async fn get_primary_key_columns(&self, table: &str) -> Result<Vec<String>, DbError>;

    async fn get_primary_key_column(&self, table: &str) -> Result<Option<String>, DbError>;

    async fn is_identity_column(&self, table: &str, column: &str) -> Result<bool, DbError>;
}
