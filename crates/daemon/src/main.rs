//! Transcache Daemon - Main Entry Point
//!
//! Composition root: settings, logging, wiring, JSON-RPC server and the
//! maintenance loop.

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use settings::Settings;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use transcache_api_rpc::{RpcServer, RpcServerConfig, RpcServices};
use transcache_core::application::{
    shutdown_channel, CacheStore, DeferredScheduler, JobLock, JobOrchestrator, JobSettings,
    MaintenanceScheduler, ProgressLog, RenderService, SourceResolver, StatusService,
};
use transcache_core::port::{MaintenanceConfig, SystemTimeProvider, UuidProvider};
use transcache_infra_http::{OpenAiConfig, OpenAiTranslationClient, WebhookPurger};
use transcache_infra_sqlite::{
    create_pool, run_migrations, SqliteDocumentSource, SqliteKeyValueStore, SqliteMaintenance,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "transcache=info";

/// Install the global subscriber
///
/// `TRANSCACHE_LOG_FORMAT` overrides the configured format. The returned guard
/// must live as long as the process or buffered file output is lost.
fn init_logging(settings: &Settings) -> Result<(Option<WorkerGuard>, bool)> {
    let format = std::env::var("TRANSCACHE_LOG_FORMAT").unwrap_or_else(|_| settings.log.format.clone());
    let json = format == "json";

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    let otel_layer = telemetry::layer()?;
    let otel_enabled = otel_layer.is_some();

    let (file_layer, guard) = match settings.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "transcache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter)
        // Production: JSON structured logging; development: pretty with colors
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().pretty()))
        .with(file_layer)
        .init();

    Ok((guard, otel_enabled))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Settings and logging
    let settings = Settings::load()?;
    let (_log_guard, otel_enabled) = init_logging(&settings)?;

    info!("Transcache daemon v{} starting...", VERSION);
    telemetry::log_status(otel_enabled);

    // 2. Database
    let db_path = settings.db_path();
    if db_path != ":memory:" {
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    info!(db_path = %db_path, "Initializing database...");

    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Adapters
    let time_provider = Arc::new(SystemTimeProvider);
    let kv = Arc::new(SqliteKeyValueStore::new(pool.clone(), time_provider.clone()));
    let documents = Arc::new(SqliteDocumentSource::new(pool.clone()));

    let client = Arc::new(
        OpenAiTranslationClient::new(OpenAiConfig {
            base_url: settings.engine.base_url.clone(),
            api_key: settings.engine.api_key.clone(),
            request_timeout: Duration::from_secs(settings.engine.request_timeout_secs),
            check_timeout: Duration::from_secs(settings.engine.check_timeout_secs),
        })
        .map_err(|e| anyhow::anyhow!("Translation client setup failed: {}", e))?,
    );
    if settings.engine.api_key.is_none() {
        warn!("No engine API key configured; translation runs will fail until one is set");
    }

    // 4. Application services
    let resolver = Arc::new(SourceResolver::new(
        documents.clone(),
        settings.jobs.document_prefix.clone(),
    ));
    let cache = CacheStore::new(kv.clone());
    let lock = JobLock::new(kv.clone(), settings.lock_ttl());
    let progress = ProgressLog::new(kv.clone(), settings.progress_ttl());

    let mut orchestrator = JobOrchestrator::new(
        resolver.clone(),
        client.clone(),
        cache.clone(),
        lock.clone(),
        progress.clone(),
        time_provider.clone(),
        Arc::new(UuidProvider),
        JobSettings {
            model: settings.engine.model.clone(),
            chunk_max_len: settings.jobs.chunk_max_len,
            inter_chunk_delay: settings.inter_chunk_delay(),
        },
    );
    if let Some(url) = &settings.purge.webhook_url {
        let purger = WebhookPurger::new(
            settings.purge.name.clone(),
            url.clone(),
            settings.purge.token.clone(),
        )
        .map_err(|e| anyhow::anyhow!("Purge webhook setup failed: {}", e))?;
        info!(name = %settings.purge.name, "Cache purge webhook enabled");
        orchestrator = orchestrator.with_purger(Arc::new(purger));
    }
    let orchestrator = Arc::new(orchestrator);

    let deferred = Arc::new(DeferredScheduler::new(orchestrator.clone()));
    let render = Arc::new(RenderService::new(
        resolver.clone(),
        cache.clone(),
        lock.clone(),
        deferred,
        Arc::new(UuidProvider),
        settings.schedule_delay(),
    ));
    let status = Arc::new(StatusService::new(resolver, cache, lock));

    let maintenance = Arc::new(MaintenanceScheduler::new(
        Arc::new(SqliteMaintenance::new(pool.clone(), time_provider.clone())),
        MaintenanceConfig {
            max_db_size_mb: settings.maintenance.max_db_size_mb,
            max_fragmentation_percent: settings.maintenance.max_fragmentation_percent,
            force_vacuum: false,
        },
        settings.maintenance_every(),
    ));

    // 5. JSON-RPC server
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            host: settings.rpc.host.clone(),
            port: settings.rpc.port,
        },
        RpcServices {
            orchestrator,
            render,
            status,
            progress,
            client,
            documents,
            maintenance: maintenance.clone(),
        },
    );
    let (rpc_addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 6. Maintenance loop
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let maintenance_handle = tokio::spawn(async move {
        maintenance.run(shutdown_rx).await;
    });

    info!(addr = %rpc_addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // Running jobs are not cancelled; their locks expire on their own
    let listeners = shutdown_tx.shutdown();
    info!(listeners, "Background loops signalled");
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    let _ = tokio::time::timeout(Duration::from_secs(5), maintenance_handle).await;
    pool.close().await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}
