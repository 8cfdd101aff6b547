use async_trait::async_trait;
use k1s0_dynamic_sql::types::normalize_data_type;
use sqlx::PgPool;

use crate::domain::entity::column_info::ColumnInfo;
use crate::domain::repository::schema_repository::SchemaRepository;
use crate::domain::value_object::TableSchemaQueryType;
use crate::infrastructure::database::DbError;

/// information_schema を参照する SchemaRepository。
/// 取得した型名は SQL Server 形式に正規化して返す。
pub struct SchemaPostgresRepository {
    pool: PgPool,
    schema: String,
}

impl SchemaPostgresRepository {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    udt_name: String,
    is_nullable: bool,
    character_maximum_length: Option<i32>,
    ordinal_position: i32,
    is_identity: bool,
    is_primary_key: bool,
}

impl From<ColumnRow> for ColumnInfo {
    fn from(r: ColumnRow) -> Self {
        // ARRAY / USER-DEFINED は udt_name の方が情報を持つ
        let engine_type = match r.data_type.as_str() {
            "ARRAY" | "USER-DEFINED" => r.udt_name,
            _ => r.data_type,
        };
        ColumnInfo {
            name: r.column_name,
            data_type: normalize_data_type(&engine_type),
            is_nullable: r.is_nullable,
            max_length: r.character_maximum_length,
            ordinal: r.ordinal_position,
            is_primary_key: r.is_primary_key,
            is_identity: r.is_identity,
        }
    }
}

/// 役割ごとに検索対象とするオブジェクト種別。
fn table_types(query_type: TableSchemaQueryType) -> &'static [&'static str] {
    match query_type {
        TableSchemaQueryType::Table | TableSchemaQueryType::Detail | TableSchemaQueryType::Mapping => {
            &["BASE TABLE"]
        }
        TableSchemaQueryType::View => &["VIEW"],
        TableSchemaQueryType::All => &["BASE TABLE", "VIEW"],
    }
}

const PK_COLUMNS_SQL: &str = r#"
SELECT kcu.column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.constraint_schema = tc.constraint_schema
 AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema = $1
  AND tc.table_name = $2
ORDER BY kcu.ordinal_position"#;

#[async_trait]
impl SchemaRepository for SchemaPostgresRepository {
    async fn search_tables(
        &self,
        pattern: &str,
        query_type: TableSchemaQueryType,
    ) -> Result<Vec<String>, DbError> {
        let types: Vec<String> = table_types(query_type).iter().map(|t| (*t).to_string()).collect();
        let mut names: Vec<String> = sqlx::query_scalar(
            r#"SELECT table_name::text FROM information_schema.tables
               WHERE table_schema = $1 AND table_type = ANY($2) AND table_name ILIKE $3
               ORDER BY table_name"#,
        )
        .bind(&self.schema)
        .bind(&types)
        .bind(format!("%{pattern}%"))
        .fetch_all(&self.pool)
        .await?;

        // テーブル値関数はビューと同じく読み取り専用の検索元として扱う
        if matches!(query_type, TableSchemaQueryType::View | TableSchemaQueryType::All) {
            let functions: Vec<String> = sqlx::query_scalar(
                r#"SELECT p.proname::text FROM pg_catalog.pg_proc p
                   JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
                   WHERE n.nspname = $1 AND p.proretset AND p.proname ILIKE $2
                   ORDER BY p.proname"#,
            )
            .bind(&self.schema)
            .bind(format!("%{pattern}%"))
            .fetch_all(&self.pool)
            .await?;
            names.extend(functions);
        }
        Ok(names)
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DbError> {
        let rows = sqlx::query_as::<_, ColumnRow>(
            r#"SELECT c.column_name::text AS column_name,
                      c.data_type::text AS data_type,
                      c.udt_name::text AS udt_name,
                      (c.is_nullable = 'YES') AS is_nullable,
                      c.character_maximum_length::int4 AS character_maximum_length,
                      c.ordinal_position::int4 AS ordinal_position,
                      (c.is_identity = 'YES' OR COALESCE(c.column_default, '') LIKE 'nextval(%') AS is_identity,
                      EXISTS (
                          SELECT 1 FROM information_schema.table_constraints tc
                          JOIN information_schema.key_column_usage kcu
                            ON kcu.constraint_name = tc.constraint_name
                           AND kcu.constraint_schema = tc.constraint_schema
                           AND kcu.table_name = tc.table_name
                          WHERE tc.constraint_type = 'PRIMARY KEY'
                            AND tc.table_schema = c.table_schema
                            AND tc.table_name = c.table_name
                            AND kcu.column_name = c.column_name
                      ) AS is_primary_key
               FROM information_schema.columns c
               WHERE c.table_schema = $1 AND c.table_name = $2
               ORDER BY c.ordinal_position"#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_primary_key_columns(&self, table: &str) -> Result<Vec<String>, DbError> {
        let columns = sqlx::query_scalar::<_, String>(PK_COLUMNS_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(columns)
    }

    /// 複合主キーの場合は先頭列を返す。
    async fn get_primary_key_column(&self, table: &str) -> Result<Option<String>, DbError> {
        Ok(self.get_primary_key_columns(table).await?.into_iter().next())
    }

    async fn is_identity_column(&self, table: &str, column: &str) -> Result<bool, DbError> {
        let identity: Option<bool> = sqlx::query_scalar(
            r#"SELECT (is_identity = 'YES' OR COALESCE(column_default, '') LIKE 'nextval(%')
               FROM information_schema.columns
               WHERE table_schema = $1 AND table_name = $2 AND column_name = $3"#,
        )
        .bind(&self.schema)
        .bind(table)
        .bind(column)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity.unwrap_or(false))
    }
}
