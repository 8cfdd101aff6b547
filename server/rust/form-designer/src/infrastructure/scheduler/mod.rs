use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::config::OrphanCleanupConfig;
use crate::usecase::orphan_cleanup::{CleanupOutcome, OrphanCleanupUseCase};

/// Windows のタイムゾーン ID と IANA ID の対応。
const WINDOWS_ZONES: &[(&str, Tz)] = &[
    ("Taipei Standard Time", Tz::Asia__Taipei),
    ("Tokyo Standard Time", Tz::Asia__Tokyo),
    ("China Standard Time", Tz::Asia__Shanghai),
    ("Korea Standard Time", Tz::Asia__Seoul),
    ("Singapore Standard Time", Tz::Asia__Singapore),
    ("SE Asia Standard Time", Tz::Asia__Bangkok),
    ("India Standard Time", Tz::Asia__Kolkata),
    ("GMT Standard Time", Tz::Europe__London),
    ("W. Europe Standard Time", Tz::Europe__Berlin),
    ("Eastern Standard Time", Tz::America__New_York),
    ("Central Standard Time", Tz::America__Chicago),
    ("Pacific Standard Time", Tz::America__Los_Angeles),
    ("UTC", Tz::UTC),
];

/// IANA ID、Windows ID の順に解決する。どちらでもなければ UTC。
pub fn resolve_timezone(id: &str) -> Tz {
    let id = id.trim();
    if let Ok(tz) = id.parse::<Tz>() {
        return tz;
    }
    if let Some((_, tz)) = WINDOWS_ZONES.iter().find(|(name, _)| name.eq_ignore_ascii_case(id)) {
        return *tz;
    }
    tracing::warn!(timezone = id, "unknown timezone, falling back to UTC");
    Tz::UTC
}

/// "HH:MM" 形式の実行時刻。
pub fn parse_run_at(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// `now` より後で、`tz` の現地時刻が `at` になる最初の時点。
///
/// 夏時間の切り替えで存在しない時刻の日は翌日に回す。
pub fn next_run_after(now: DateTime<Utc>, tz: Tz, at: NaiveTime) -> DateTime<Utc> {
    let mut date = now.with_timezone(&tz).date_naive();
    for _ in 0..3 {
        if let Some(local) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            let utc = local.with_timezone(&Utc);
            if utc > now {
                return utc;
            }
        }
        let Some(next) = date.succ_opt() else { break };
        date = next;
    }
    now + chrono::Duration::days(1)
}

/// OrphanCleanupScheduler は孤立した下書きの掃除を毎日決まった時刻に起動する。
pub struct OrphanCleanupScheduler {
    usecase: Arc<OrphanCleanupUseCase>,
    timezone: Tz,
    run_at: NaiveTime,
    cancel_token: CancellationToken,
}

impl OrphanCleanupScheduler {
    pub fn new(usecase: Arc<OrphanCleanupUseCase>, config: &OrphanCleanupConfig) -> Self {
        let run_at = parse_run_at(&config.run_at).unwrap_or_else(|| {
            tracing::warn!(run_at = %config.run_at, "invalid run_at, using 03:00");
            NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN)
        });
        Self {
            usecase,
            timezone: resolve_timezone(&config.timezone),
            run_at,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let usecase = self.usecase.clone();
        let token = self.cancel_token.clone();
        let tz = self.timezone;
        let at = self.run_at;

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_run_after(now, tz, at);
                let wait = (next - now).to_std().unwrap_or(Duration::from_secs(60));
                tracing::info!(next_run = %next.with_timezone(&tz), "orphan cleanup scheduled");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {
                        // 実行は別タスク。前回分が終わっていなければ usecase 側で skip される
                        let usecase = usecase.clone();
                        tokio::spawn(async move { Self::tick(&usecase).await });
                    }
                }
            }
            tracing::info!("orphan cleanup scheduler stopped");
        })
    }

    async fn tick(usecase: &OrphanCleanupUseCase) {
        match usecase.run().await {
            Ok(CleanupOutcome::Completed { removed }) => {
                tracing::info!(removed, "scheduled orphan cleanup completed");
            }
            Ok(CleanupOutcome::Skipped) => {
                tracing::warn!("scheduled orphan cleanup skipped: previous run still in progress");
            }
            Err(e) => tracing::error!(error = %e, "scheduled orphan cleanup failed"),
        }
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}
