use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// ユーザーの所属グループのいずれかが (area, controller) に対して action を許可されているか。
    async fn has_permission(
        &self,
        user_id: &str,
        area: &str,
        controller: &str,
        action: &str,
    ) -> anyhow::Result<bool>;
}
