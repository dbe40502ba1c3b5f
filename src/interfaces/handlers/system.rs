use actix_web::{get, web, HttpResponse, Responder};
use humantime::format_duration;
use chrono::Utc;
use std::time::Duration;
use sysinfo::System;
use serde::Serialize;

use crate::{
    constants::START_TIME,
    db::redis_pool::ping,
    repositories::{delivery::SubmissionDelivery, rate_limit::RateLimitStore},
    AppState,
};

#[derive(Serialize)]
struct HealthCheckResponse {
    status: String,
    uptime: String,
    timestamp: String,
    start_at: String,
    version: String,
    rate_limit_backend: String,
    redis_status: String,
    delivery: String,
    memory_usage: String,
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let now_utc = Utc::now();
    let uptime_duration = now_utc.signed_duration_since(*START_TIME);
    let human_uptime = format_duration(Duration::from_secs(uptime_duration.num_seconds().max(0) as u64));

    let redis_status = match &state.redis_pool {
        Some(pool) => match ping(pool).await {
            Ok(()) => "OK",
            Err(e) => {
                tracing::warn!("Redis health check failed: {}", e);
                "Unavailable"
            }
        },
        None => "Not configured",
    };

    let mut sys = System::new_all();
    sys.refresh_all();
    let process = sysinfo::get_current_pid().ok().and_then(|pid| sys.process(pid));
    let memory_usage = process.map_or("Unknown".to_string(), |p|
        format!("{:.2} MB", p.memory() as f64 / 1024.0 / 1024.0)
    );

    let handler = &state.contact_handler;
    HttpResponse::Ok().json(HealthCheckResponse {
        status: "healthy".to_string(),
        uptime: human_uptime.to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rate_limit_backend: handler.gate.store().backend_name().to_string(),
        redis_status: redis_status.to_string(),
        delivery: handler.delivery.name().to_string(),
        memory_usage,
    })
}
