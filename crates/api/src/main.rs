//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Cache, InMemoryCache, InMemoryStore, PostgresStore, RedisCache, Seed, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn connect_cache(config: &Config) -> Arc<dyn Cache> {
    match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("using redis cache");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, using in-process cache");
                Arc::new(InMemoryCache::new())
            }
        },
        None => Arc::new(InMemoryCache::new()),
    }
}

async fn serve<S: Store + 'static>(
    store: Arc<S>,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    if let Some(path) = &config.seed_path {
        Seed::load(path).await?.apply(store.as_ref()).await?;
    }

    let cache = connect_cache(config).await;
    let state = api::create_state(store, cache, api::vnpay_gateway(config), config);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
    for (variable, value) in &config.rejected {
        tracing::warn!(variable, value = %value, "invalid configuration value, using default");
    }

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Build the store and serve until shutdown
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, 10).await?;
            store.run_migrations().await?;
            tracing::info!("using postgres store");
            let result = serve(Arc::new(store.clone()), &config, metrics_handle).await;
            store.close().await;
            result?;
        }
        None => {
            tracing::info!("using in-memory store");
            serve(Arc::new(InMemoryStore::new()), &config, metrics_handle).await?;
        }
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
