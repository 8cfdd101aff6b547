//! SQL execution logging decorators.
//!
//! Every statement run through a [`LoggedDatabase`] is appended to the SQL
//! log, successful or not. A failing sink is reported with `warn!` and never
//! changes the outcome of the statement.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use k1s0_dynamic_sql::{DbRow, SqlStatement};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Database, DbError, SqlExecutor, UnitOfWork};
use crate::domain::entity::sql_log::SqlLogEntry;
use crate::domain::repository::sql_log_repository::SqlLogRepository;

pub struct LoggedDatabase {
    inner: Arc<dyn Database>,
    sink: Arc<dyn SqlLogRepository>,
}

impl LoggedDatabase {
    pub fn new(inner: Arc<dyn Database>, sink: Arc<dyn SqlLogRepository>) -> Self {
        Self { inner, sink }
    }
}

#[async_trait]
impl Database for LoggedDatabase {
    async fn begin(&self, actor: &str) -> Result<Box<dyn UnitOfWork>, DbError> {
        let inner = self.inner.begin(actor).await?;
        Ok(Box::new(LoggedUnitOfWork {
            inner,
            logger: SqlLogger::new(self.sink.clone(), actor),
        }))
    }

    async fn connection(&self, actor: &str) -> Result<Box<dyn SqlExecutor>, DbError> {
        let inner = self.inner.connection(actor).await?;
        Ok(Box::new(LoggedConnection {
            inner,
            logger: SqlLogger::new(self.sink.clone(), actor),
        }))
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.inner.ping().await
    }
}

struct SqlLogger {
    sink: Arc<dyn SqlLogRepository>,
    actor: String,
}

impl SqlLogger {
    fn new(sink: Arc<dyn SqlLogRepository>, actor: &str) -> Self {
        Self {
            sink,
            actor: actor.to_string(),
        }
    }

    async fn record(
        &self,
        stmt: &SqlStatement,
        started: Instant,
        outcome: Result<Option<u64>, String>,
    ) {
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        let (is_success, affected_rows, error_message) = match outcome {
            Ok(rows) => (true, rows.and_then(|r| i64::try_from(r).ok()), None),
            Err(message) => (false, None, Some(message)),
        };
        let entry = SqlLogEntry {
            id: Uuid::new_v4(),
            sql_text: stmt.sql.clone(),
            parameters: stmt.params_json(),
            duration_ms,
            affected_rows,
            is_success,
            error_message,
            actor: self.actor.clone(),
            executed_at: Utc::now(),
        };
        debug!(sql = %entry.sql_text, duration_ms, is_success, "sql executed");
        if let Err(e) = self.sink.append(&entry).await {
            warn!(error = %e, "failed to write sql log");
        }
    }

    async fn execute(&self, inner: &mut dyn SqlExecutor, stmt: &SqlStatement) -> Result<u64, DbError> {
        let started = Instant::now();
        let result = inner.execute(stmt).await;
        self.record(stmt, started, result.as_ref().map(|n| Some(*n)).map_err(ToString::to_string))
            .await;
        result
    }

    async fn query(
        &self,
        inner: &mut dyn SqlExecutor,
        stmt: &SqlStatement,
    ) -> Result<Vec<DbRow>, DbError> {
        let started = Instant::now();
        let result = inner.query(stmt).await;
        self.record(stmt, started, result.as_ref().map(|_| None).map_err(ToString::to_string))
            .await;
        result
    }
}

struct LoggedConnection {
    inner: Box<dyn SqlExecutor>,
    logger: SqlLogger,
}

#[async_trait]
impl SqlExecutor for LoggedConnection {
    async fn execute(&mut self, stmt: &SqlStatement) -> Result<u64, DbError> {
        self.logger.execute(self.inner.as_mut(), stmt).await
    }

    async fn query(&mut self, stmt: &SqlStatement) -> Result<Vec<DbRow>, DbError> {
        self.logger.query(self.inner.as_mut(), stmt).await
    }
}

struct LoggedUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    logger: SqlLogger,
}

#[async_trait]
impl SqlExecutor for LoggedUnitOfWork {
    async fn execute(&mut self, stmt: &SqlStatement) -> Result<u64, DbError> {
        self.logger.execute(self.inner.executor(), stmt).await
    }

    async fn query(&mut self, stmt: &SqlStatement) -> Result<Vec<DbRow>, DbError> {
        self.logger.query(self.inner.executor(), stmt).await
    }
}

#[async_trait]
impl UnitOfWork for LoggedUnitOfWork {
    fn executor(&mut self) -> &mut dyn SqlExecutor {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.inner.rollback().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::sql_log_repository::MockSqlLogRepository;
    use crate::infrastructure::database::scripted::ScriptedDatabase;

    #[tokio::test]
    async fn test_successful_statement_is_logged() {
        let scripted = ScriptedDatabase::new();
        scripted.on_execute("UPDATE", 3);

        let mut sink = MockSqlLogRepository::new();
        sink.expect_append()
            .withf(|entry| {
                entry.is_success
                    && entry.affected_rows == Some(3)
                    && entry.actor == "alice"
                    && entry.sql_text.starts_with("UPDATE")
                    && entry.parameters["set_A"] == 1
            })
            .times(1)
            .returning(|_| Ok(()));

        let db = LoggedDatabase::new(Arc::new(scripted.clone()), Arc::new(sink));
        let mut uow = db.begin("alice").await.unwrap();
        let stmt = SqlStatement::new("UPDATE [T] SET [A]=@set_A").bind("set_A", 1);
        assert_eq!(uow.execute(&stmt).await.unwrap(), 3);
        uow.commit().await.unwrap();
        assert_eq!(scripted.commits(), 1);
    }

    #[tokio::test]
    async fn test_failed_statement_is_logged_with_message() {
        let scripted = ScriptedDatabase::new();
        scripted.fail_on("DELETE", "constraint violated");

        let mut sink = MockSqlLogRepository::new();
        sink.expect_append()
            .withf(|entry| {
                !entry.is_success
                    && entry.error_message.as_deref() == Some("constraint violated")
            })
            .times(1)
            .returning(|_| Ok(()));

        let db = LoggedDatabase::new(Arc::new(scripted), Arc::new(sink));
        let mut conn = db.connection("bob").await.unwrap();
        let result = conn.execute(&SqlStatement::new("DELETE FROM [T] WHERE [Id]=1")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_statement() {
        let scripted = ScriptedDatabase::new();
        scripted.on_query("SELECT", vec![DbRow::from_pairs([("A", 1)])]);

        let mut sink = MockSqlLogRepository::new();
        sink.expect_append()
            .returning(|_| Err(anyhow::anyhow!("log table missing")));

        let db = LoggedDatabase::new(Arc::new(scripted), Arc::new(sink));
        let mut conn = db.connection("carol").await.unwrap();
        let rows = conn.query(&SqlStatement::new("SELECT [A] FROM [T]")).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
