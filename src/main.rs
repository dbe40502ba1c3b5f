use std::time::Duration;

use actix_web::{web, HttpServer};
use contact_gate::{
    background_task::start_sweep_task,
    constants::START_TIME,
    create_app,
    graceful_shutdown::shutdown_signal,
    repositories::rate_limit::RateLimitStore,
    settings::AppConfig,
    telemetry::init_tracing,
    AppState,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();
    once_cell::sync::Lazy::force(&START_TIME);

    let config = match AppConfig::new() {
        Ok(cfg) => {
            tracing::info!("Loaded configuration: {:?}", cfg);
            cfg
        },
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::from_config(&config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    let server_addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        "🚀 Starting contact API v{} on {} (rate limit: {} per {}s, {} backend)",
        env!("CARGO_PKG_VERSION"),
        server_addr,
        config.rate_limit_max_submissions,
        config.rate_limit_window_secs,
        app_state.rate_limit_store().backend_name()
    );

    tokio::spawn(start_sweep_task(
        app_state.rate_limit_store(),
        config.rate_limit_policy(),
        Duration::from_secs(config.rate_limit_sweep_interval_secs),
    ));

    let cors_origins = config.cors_origins();
    let max_body_bytes = config.max_body_bytes;

    let server = HttpServer::new(move || {
        create_app(app_state.clone(), &cors_origins, max_body_bytes)
    })
    .workers(config.worker_count)
    .bind(server_addr)?
    .run();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => Ok(()),
    }
}
