use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::finish;
use super::manage_form_masters::cascade_masters;
use crate::domain::error::FormError;
use crate::infrastructure::database::Database;
use crate::infrastructure::persistence::{self, form_master_store};

/// バックグラウンド処理が監査列に記録する実行者。
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "Outcome", rename_all = "PascalCase")]
pub enum CleanupOutcome {
    Completed { removed: usize },
    /// 前回の実行がまだ終わっていないため何もしなかった。
    Skipped,
}

/// OrphanCleanupUseCase は確定済みマスタから参照されない古い下書きを論理削除する。
///
/// 同時に 1 回しか実行しない。実行中に呼ばれた場合は待たずに `Skipped` を返す。
pub struct OrphanCleanupUseCase {
    db: Arc<dyn Database>,
    min_age: chrono::Duration,
    running: AtomicBool,
}

/// スコープを抜けると実行中フラグを戻す。
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OrphanCleanupUseCase {
    pub fn new(db: Arc<dyn Database>, min_age_hours: i64) -> Self {
        Self {
            db,
            min_age: chrono::Duration::hours(min_age_hours.max(0)),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run(&self) -> Result<CleanupOutcome, FormError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("orphan cleanup is already running, skipped");
            return Ok(CleanupOutcome::Skipped);
        }
        let _guard = RunningGuard(&self.running);

        let cutoff = persistence::now() - self.min_age;
        let mut uow = self.db.begin(SYSTEM_ACTOR).await?;
        let result = async {
            let exec = uow.executor();
            let ids = form_master_store::find_orphan_ids(exec, cutoff).await?;
            if !ids.is_empty() {
                cascade_masters(exec, &ids, SYSTEM_ACTOR).await?;
            }
            Ok(ids.len())
        }
        .await;
        let removed = finish(uow, result).await?;
        info!(removed, %cutoff, "orphan cleanup finished");
        Ok(CleanupOutcome::Completed { removed })
    }
}
