use async_trait::async_trait;

use crate::domain::entity::sql_log::SqlLogEntry;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SqlLogRepository: Send + Sync {
    async fn append(&self, entry: &SqlLogEntry) -> anyhow::Result<()>;
}
