//! Statement execution.
//!
//! Every statement reaches the driver through [`SqlExecutor`]. A
//! [`UnitOfWork`] is an executor bound to one transaction; callers that need
//! all-or-nothing behaviour acquire one from [`Database::begin`] and pass
//! `uow.executor()` down to every step.

pub mod logging;
pub mod postgres;
#[cfg(test)]
pub mod scripted;

use std::time::Duration;

use async_trait::async_trait;
use k1s0_dynamic_sql::postgres::RenderError;
use k1s0_dynamic_sql::{DbRow, SqlStatement, SqlValue};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Driver(#[from] sqlx::Error),

    /// Driver failure while running `sql` (the rendered PostgreSQL text).
    #[error("database error: {source}")]
    Statement {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to render statement: {0}")]
    Render(#[from] RenderError),

    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("column '{column}' has unsupported type '{type_name}'")]
    UnsupportedColumn { column: String, type_name: String },

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait SqlExecutor: Send {
    /// Runs a statement and returns the number of affected rows.
    async fn execute(&mut self, stmt: &SqlStatement) -> Result<u64, DbError>;

    async fn query(&mut self, stmt: &SqlStatement) -> Result<Vec<DbRow>, DbError>;

    async fn query_one(&mut self, stmt: &SqlStatement) -> Result<Option<DbRow>, DbError> {
        Ok(self.query(stmt).await?.into_iter().next())
    }

    /// First column of the first row; `None` when no row comes back.
    async fn query_scalar(&mut self, stmt: &SqlStatement) -> Result<Option<SqlValue>, DbError> {
        Ok(self
            .query_one(stmt)
            .await?
            .and_then(|row| row.values.into_iter().next()))
    }
}

#[async_trait]
pub trait UnitOfWork: SqlExecutor {
    fn executor(&mut self) -> &mut dyn SqlExecutor;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

#[async_trait]
pub trait Database: Send + Sync {
    /// Starts a transaction. `actor` is recorded with every statement it runs.
    async fn begin(&self, actor: &str) -> Result<Box<dyn UnitOfWork>, DbError>;

    /// Auto-commit executor for standalone reads and writes.
    async fn connection(&self, actor: &str) -> Result<Box<dyn SqlExecutor>, DbError>;

    async fn ping(&self) -> Result<(), DbError>;
}
