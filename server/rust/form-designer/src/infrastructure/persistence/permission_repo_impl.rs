use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::repository::permission_repository::PermissionRepository;

/// グループ単位の権限表を引く PermissionRepository。
///
/// ユーザーは `SYS_USER_GROUP` でグループに属し、グループは
/// `SYS_GROUP_FUNCTION_ACTION` で機能 (`SYS_FUNCTION` の AREA / CONTROLLER) ごとの
/// アクションコードを許可される。
pub struct PermissionPostgresRepository {
    pool: PgPool,
}

impl PermissionPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const HAS_PERMISSION_SQL: &str = r#"
SELECT EXISTS (
    SELECT 1
    FROM "SYS_USER_GROUP" ug
    JOIN "SYS_GROUP_FUNCTION_ACTION" gfa ON gfa."GROUP_ID" = ug."GROUP_ID"
    JOIN "SYS_FUNCTION" f ON f."ID" = gfa."FUNCTION_ID"
    WHERE ug."USER_ID" = $1
      AND lower(f."AREA") = lower($2)
      AND lower(f."CONTROLLER") = lower($3)
      AND gfa."ACTION_CODE" = $4
      AND NOT ug."IS_DELETED"
      AND NOT gfa."IS_DELETED"
      AND NOT f."IS_DELETED"
)"#;

#[async_trait]
impl PermissionRepository for PermissionPostgresRepository {
    async fn has_permission(
        &self,
        user_id: &str,
        area: &str,
        controller: &str,
        action: &str,
    ) -> anyhow::Result<bool> {
        let allowed: bool = sqlx::query_scalar(HAS_PERMISSION_SQL)
            .bind(user_id)
            .bind(area)
            .bind(controller)
            .bind(action)
            .fetch_one(&self.pool)
            .await?;
        Ok(allowed)
    }
}
