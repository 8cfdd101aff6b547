use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entity::sql_log::SqlLogEntry;
use crate::domain::repository::sql_log_repository::SqlLogRepository;

/// `SYS_SQL_LOG` へ追記する。ログ書き込み自体は記録対象にしないため、
/// ロギング層を通さずプールへ直接書き込む。
pub struct SqlLogPostgresRepository {
    pool: PgPool,
}

impl SqlLogPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlLogRepository for SqlLogPostgresRepository {
    async fn append(&self, entry: &SqlLogEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO "SYS_SQL_LOG"
               ("ID", "SQL_TEXT", "PARAMETERS", "DURATION_MS", "AFFECTED_ROWS",
                "IS_SUCCESS", "ERROR_MESSAGE", "ACTOR", "EXECUTED_AT")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(entry.id)
        .bind(&entry.sql_text)
        .bind(&entry.parameters)
        .bind(entry.duration_ms)
        .bind(entry.affected_rows)
        .bind(entry.is_success)
        .bind(&entry.error_message)
        .bind(&entry.actor)
        .bind(entry.executed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
