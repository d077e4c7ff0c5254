use candle_query_core::api::AppState;
use candle_query_core::cache::{spawn_reaper, Cache};
use candle_query_core::config::{AppConfig, ServerMode};
use candle_query_core::database::repositories::{
    PgAvailabilityRepository, PgCandleRepository, PgSymbolRepository,
};
use candle_query_core::manager::{DataManager, DataManagerConfig, PgCandleGenerator, PgTickLoader};
use candle_query_core::planner::ResolutionPlanner;
use candle_query_core::pool::{spawn_health_check, ConnectionPool};
use candle_query_core::query::QueryExecutor;
use candle_query_core::smart::SmartQuery;
use candle_query_core::{create_router, ResolutionCatalog};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env());
    init_tracing(&config);

    tracing::info!(address = %config.server.address, mode = ?config.server.mode, "starting candle query core");

    let catalog = Arc::new(ResolutionCatalog::default());

    let pool = match ConnectionPool::establish(
        &config.database.url,
        config.database.min_conns,
        config.database.max_conns,
        config.database.max_lifetime,
        config.database.acquire_timeout,
    ) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            tracing::error!(error = %e, "failed to establish connection pool; exiting");
            std::process::exit(1);
        }
    };

    if let Err(e) = pool.ping() {
        tracing::error!(error = %e, "initial store ping failed; exiting");
        std::process::exit(1);
    }
    tracing::info!("store ping ok");

    let health_check = spawn_health_check(pool.clone());

    let candle_repository = Arc::new(PgCandleRepository::new(pool.clone(), config.database.acquire_timeout));
    let availability_repository = Arc::new(PgAvailabilityRepository::new(pool.clone(), config.database.acquire_timeout));
    let symbol_repository = Arc::new(PgSymbolRepository::new(pool.clone(), config.database.acquire_timeout));

    let executor = QueryExecutor::new(candle_repository);
    let planner = ResolutionPlanner::new(catalog.clone());
    let cache = Arc::new(Cache::new(config.cache.max_size));
    let reaper = spawn_reaper(cache.clone());

    let smart_query = Arc::new(SmartQuery::with_ttl_policy(planner, executor, cache.clone(), config.cache.ttl_policy()));

    let loader = Arc::new(PgTickLoader::new(pool.clone(), config.database.acquire_timeout));
    let generator = Arc::new(PgCandleGenerator::new(pool.clone(), config.database.acquire_timeout));
    let data_manager = DataManager::new(
        availability_repository,
        loader,
        generator,
        DataManagerConfig {
            num_workers: config.data.worker_count,
            queue_capacity: config.data.queue_capacity,
            job_deadline: config.data.job_deadline,
            job_retention: chrono::Duration::from_std(config.data.job_retention).unwrap_or(chrono::Duration::minutes(15)),
        },
    );
    let retention_sweeper = data_manager.clone().spawn_retention_sweeper();

    let state = AppState::new(config.clone(), catalog, pool.clone(), cache.clone(), smart_query, data_manager.clone(), symbol_repository);

    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.server.address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %config.server.address, "failed to bind listener; exiting");
            std::process::exit(1);
        }
    };

    tracing::info!(address = %config.server.address, "candle query core listening");
    tracing::info!("swagger ui: http://{}/swagger-ui", config.server.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    health_check.abort();

    tracing::info!("cancelling in-flight fetches, deadline-bound");
    data_manager.shutdown().await;
    retention_sweeper.abort();

    tracing::info!("draining cache reaper");
    reaper.abort();
    cache.sweep();

    drop(data_manager);
    match Arc::try_unwrap(pool) {
        Ok(_pool) => tracing::info!("connection pool closed"),
        Err(pool) => tracing::debug!(refs = Arc::strong_count(&pool), "connection pool still referenced; closing on process exit"),
    }

    tracing::info!("shutdown complete");
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "candle_query_core=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    match config.server.mode {
        ServerMode::Debug => registry.with(tracing_subscriber::fmt::layer()).init(),
        ServerMode::Production => registry.with(tracing_subscriber::fmt::layer().compact().with_target(false)).init(),
    }
}

/// Waits on Ctrl-C or SIGTERM. Resolving this future only stops
/// `axum::serve` from accepting new connections; the rest of the teardown
/// order (cancel in-flight fetches with a deadline, drain the cache
/// reaper, close the pool) runs in `main` after `serve` returns.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
