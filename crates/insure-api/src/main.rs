//! Risk/Hedging Coordination Plane - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// The risk/hedging coordination plane's API and monitoring process.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via INSURE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    insure_telemetry::init_logging()?;

    let args = Args::parse();
    info!("starting insure-api v{}", env!("CARGO_PKG_VERSION"));

    let config = insure_api::AppConfig::load(args.config);
    info!(port = config.port, "configuration loaded");

    let shared = insure_api::app::initial_shared_state(&config);
    let hub = std::sync::Arc::new(insure_hub::Hub::new());
    let api_state = insure_api::app::initial_api_state(&config, shared.clone()).await;
    let rate_limit_backend = insure_security::select_backend(config.redis_url.as_deref()).await;

    insure_api::app::spawn_background_tasks(&config, shared, hub.clone());

    let reaper_hub = hub.clone();
    let heartbeat_interval_secs = config.hub.heartbeat_interval_secs;
    let client_timeout_secs = config.hub.client_timeout_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(heartbeat_interval_secs));
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            reaper_hub.reap_stale(now, client_timeout_secs);
        }
    });

    let router = insure_api::app::build_router(&config, api_state, rate_limit_backend);
    let ws_router = insure_hub::create_router(insure_hub::AppState {
        hub: hub.clone(),
        config: config.hub.clone(),
    });
    let app = router.merge(ws_router);

    let addr = format!("0.0.0.0:{}", config.port);
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;

    Ok(())
}
