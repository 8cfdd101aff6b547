use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tracing::info;

use k1s0_form_designer_server::adapter;
use k1s0_form_designer_server::domain;
use k1s0_form_designer_server::infrastructure;
use k1s0_form_designer_server::usecase;

use adapter::handler::{self, AppState};
use adapter::middleware::auth::FormDesignerAuthState;
use infrastructure::config::Config;
use infrastructure::database::logging::LoggedDatabase;
use infrastructure::database::postgres::PgDatabase;
use infrastructure::database::Database;
use infrastructure::persistence::permission_repo_impl::PermissionPostgresRepository;
use infrastructure::persistence::schema_repo_impl::SchemaPostgresRepository;
use infrastructure::persistence::sql_log_repo_impl::SqlLogPostgresRepository;
use infrastructure::scheduler::OrphanCleanupScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Config
    let cfg = Config::load()?;

    // 2. Logging
    infrastructure::logging::init_logging(&cfg.app)?;
    info!(version = %cfg.app.version, environment = %cfg.app.environment, "starting {}", cfg.app.name);

    // 3. Database
    let db_cfg = cfg
        .database
        .as_ref()
        .context("database section is required")?;
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| db_cfg.connection_url());
    let pool = connect_pool(&url, &db_cfg.schema, db_cfg.max_connections)
        .await
        .context("failed to connect database")?;
    // SQL ログ書き込みとスキーマ参照専用のプール
    let aux_pool = connect_pool(&url, &db_cfg.schema, db_cfg.aux_max_connections.max(1))
        .await
        .context("failed to connect auxiliary database pool")?;
    info!(schema = %db_cfg.schema, "database connected");

    if db_cfg.run_migrations {
        pool.execute(format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", db_cfg.schema.replace('"', "\"\"")).as_str())
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("migrations applied");
    }

    // 4. SQL executor (+ SQL ログ)
    let pg: Arc<dyn Database> = Arc::new(PgDatabase::new(
        pool.clone(),
        Duration::from_secs(db_cfg.statement_timeout_secs),
    ));
    let db: Arc<dyn Database> = if cfg.sql_log.enabled {
        Arc::new(LoggedDatabase::new(pg, Arc::new(SqlLogPostgresRepository::new(aux_pool.clone()))))
    } else {
        pg
    };

    // 5. Repositories
    let schema_repo: Arc<dyn domain::repository::SchemaRepository> =
        Arc::new(SchemaPostgresRepository::new(aux_pool.clone(), db_cfg.schema.clone()));
    let permissions: Arc<dyn domain::repository::PermissionRepository> =
        Arc::new(PermissionPostgresRepository::new(pool.clone()));

    // 6. Use cases
    let orphan_cleanup_uc = Arc::new(usecase::OrphanCleanupUseCase::new(
        db.clone(),
        cfg.orphan_cleanup.min_age_hours,
    ));
    let state = AppState {
        db: db.clone(),
        form_masters_uc: Arc::new(usecase::ManageFormMastersUseCase::new(db.clone(), schema_repo.clone())),
        field_configs_uc: Arc::new(usecase::ManageFieldConfigsUseCase::new(db.clone(), schema_repo.clone())),
        validation_rules_uc: Arc::new(usecase::ManageValidationRulesUseCase::new(db.clone())),
        dropdowns_uc: Arc::new(usecase::ManageDropdownsUseCase::new(db.clone())),
        delete_guards_uc: Arc::new(usecase::ManageDeleteGuardsUseCase::new(db.clone())),
        form_data_uc: Arc::new(usecase::FormDataUseCase::new(db.clone(), schema_repo.clone())),
        master_detail_uc: Arc::new(usecase::MasterDetailUseCase::new(
            db.clone(),
            schema_repo.clone(),
            cfg.form.relation_column_suffixes.clone(),
        )),
        many_to_many_uc: Arc::new(usecase::ManyToManyUseCase::new(db.clone(), schema_repo)),
        orphan_cleanup_uc: orphan_cleanup_uc.clone(),
        permissions,
        // 7. Auth
        auth_state: cfg.auth.as_ref().map(FormDesignerAuthState::new),
    };
    if state.auth_state.is_none() {
        tracing::warn!("auth is not configured; API runs without authentication");
    }

    // 8. Orphan cleanup scheduler
    let scheduler = OrphanCleanupScheduler::new(orphan_cleanup_uc, &cfg.orphan_cleanup);
    let scheduler_handle = cfg.orphan_cleanup.enabled.then(|| scheduler.start());

    // 9. REST server
    let app = handler::router(state);
    let rest_addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!("REST server listening on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "orphan cleanup scheduler task ended abnormally");
        }
    }
    pool.close().await;
    aux_pool.close().await;
    info!("{} exited", cfg.app.name);
    Ok(())
}

/// 接続ごとに search_path を設定するプールを作る。
async fn connect_pool(url: &str, schema: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let search_path = format!("SET search_path TO \"{}\", public", schema.replace('"', "\"\""));
    PgPoolOptions::new()
        .max_connections(max_connections)
        .after_connect(move |conn, _meta| {
            let sql = search_path.clone();
            Box::pin(async move {
                conn.execute(sql.as_str()).await?;
                Ok(())
            })
        })
        .connect(url)
        .await
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
