//! Process entry point: load configuration, start the engine and its
//! sweeper, bind the HTTP listener, serve.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hkv_server::{app, env_config, metrics, state::AppState, HkvCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config =
        env_config::load().map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_config::log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        max_size = config.engine.max_size,
        bind_addr = %config.bind_addr,
        "starting hkv-server"
    );

    let cache: Arc<HkvCache> = Arc::new(HkvCache::new(config.engine));
    cache.start_sweeper();

    let state = Arc::new(AppState {
        cache,
        metrics: metrics::Metrics::new(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("hkv-server listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state, "static")).await?;

    Ok(())
}
