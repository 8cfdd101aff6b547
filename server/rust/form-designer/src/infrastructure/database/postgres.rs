use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use k1s0_dynamic_sql::{postgres::render, DbRow, SqlStatement, SqlValue};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, Transaction, TypeInfo};
use uuid::Uuid;

use super::{Database, DbError, SqlExecutor, UnitOfWork};

/// PgDatabase executes canonical statements against a PostgreSQL pool.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
    timeout: Duration,
}

impl PgDatabase {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn begin(&self, _actor: &str) -> Result<Box<dyn UnitOfWork>, DbError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork {
            tx,
            timeout: self.timeout,
        }))
    }

    async fn connection(&self, _actor: &str) -> Result<Box<dyn SqlExecutor>, DbError> {
        Ok(Box::new(PgConnection {
            pool: self.pool.clone(),
            timeout: self.timeout,
        }))
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Auto-commit executor; each statement checks a connection out of the pool.
pub struct PgConnection {
    pool: PgPool,
    timeout: Duration,
}

#[async_trait]
impl SqlExecutor for PgConnection {
    async fn execute(&mut self, stmt: &SqlStatement) -> Result<u64, DbError> {
        execute_on(&self.pool, stmt, self.timeout).await
    }

    async fn query(&mut self, stmt: &SqlStatement) -> Result<Vec<DbRow>, DbError> {
        query_on(&self.pool, stmt, self.timeout).await
    }
}

/// Executor bound to one transaction. Dropping it without commit rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    timeout: Duration,
}

#[async_trait]
impl SqlExecutor for PgUnitOfWork {
    async fn execute(&mut self, stmt: &SqlStatement) -> Result<u64, DbError> {
        execute_on(&mut *self.tx, stmt, self.timeout).await
    }

    async fn query(&mut self, stmt: &SqlStatement) -> Result<Vec<DbRow>, DbError> {
        query_on(&mut *self.tx, stmt, self.timeout).await
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn executor(&mut self) -> &mut dyn SqlExecutor {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn execute_on<'c, E>(executor: E, stmt: &SqlStatement, default: Duration) -> Result<u64, DbError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let (sql, args) = render(stmt)?;
    let query = bind_all(sqlx::query(&sql), &args);
    let limit = stmt.timeout.unwrap_or(default);
    let result = tokio::time::timeout(limit, query.execute(executor))
        .await
        .map_err(|_| DbError::Timeout(limit))?
        .map_err(|source| DbError::Statement { sql: sql.clone(), source })?;
    Ok(result.rows_affected())
}

async fn query_on<'c, E>(executor: E, stmt: &SqlStatement, default: Duration) -> Result<Vec<DbRow>, DbError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let (sql, args) = render(stmt)?;
    let query = bind_all(sqlx::query(&sql), &args);
    let limit = stmt.timeout.unwrap_or(default);
    let rows = tokio::time::timeout(limit, query.fetch_all(executor))
        .await
        .map_err(|_| DbError::Timeout(limit))?
        .map_err(|source| DbError::Statement { sql: sql.clone(), source })?;
    rows.iter().map(decode_row).collect()
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    args: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in args {
        query = match value.clone() {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::BigInt(v) => query.bind(v),
            SqlValue::Decimal(v) => query.bind(v),
            SqlValue::Float(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Guid(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<DbRow, DbError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(decode_value(row, i, column.name(), column.type_info().name())?);
    }
    Ok(DbRow::new(columns, values))
}

fn decode_value(row: &PgRow, i: usize, column: &str, type_name: &str) -> Result<SqlValue, DbError> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(i)?.map(SqlValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(i)?
            .map(|v| SqlValue::Int(i32::from(v))),
        "INT4" => row.try_get::<Option<i32>, _>(i)?.map(SqlValue::Int),
        "INT8" => row.try_get::<Option<i64>, _>(i)?.map(SqlValue::BigInt),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(i)?.map(SqlValue::Decimal),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)?
            .map(|v| SqlValue::Float(f64::from(v))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i)?.map(SqlValue::Float),
        "UUID" => row.try_get::<Option<Uuid>, _>(i)?.map(SqlValue::Guid),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(i)?.map(SqlValue::Date),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(i)?
            .map(SqlValue::DateTime),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(i)?
            .map(|v| SqlValue::DateTime(v.naive_utc())),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(i)?
            .map(|v| SqlValue::Text(v.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(i)?.map(SqlValue::Text)
        }
        other => row
            .try_get_unchecked::<Option<String>, _>(i)
            .map_err(|_| DbError::UnsupportedColumn {
                column: column.to_string(),
                type_name: other.to_string(),
            })?
            .map(SqlValue::Text),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}
