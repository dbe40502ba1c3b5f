use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    middleware::NormalizePath,
    web, App,
};
use anyhow::Context;
use deadpool_redis::Pool as RedisPool;
use tracing_actix_web::TracingLogger;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod telemetry;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::{db, delivery, limiter, utils};

use errors::AppError;
use limiter::{InMemoryRateLimitStore, RedisRateLimitStore};
use repositories::{delivery::SubmissionDelivery, rate_limit::RateLimitStore};
use settings::AppConfig;
use use_cases::contact::ContactHandler;

pub type SharedRateLimitStore = Arc<dyn RateLimitStore>;
pub type SharedDelivery = Arc<dyn SubmissionDelivery>;
pub type AppContactHandler = ContactHandler<SharedRateLimitStore, SharedDelivery>;

pub struct AppState {
    pub contact_handler: AppContactHandler,
    pub redis_pool: Option<RedisPool>,
    pub trust_forwarded_headers: bool,
}

impl AppState {
    /// Connects to Redis when `redis_url` is set and builds the state on top.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let redis_pool = match &config.redis_url {
            Some(url) => Some(
                db::redis_pool::create_redis_pool(url)
                    .await
                    .context("Redis unavailable")?,
            ),
            None => None,
        };

        AppState::new(config, redis_pool).context("Failed to build application state")
    }

    /// Redis-backed counters when a pool is given, in-process ones otherwise.
    pub fn new(config: &AppConfig, redis_pool: Option<RedisPool>) -> Result<Self, AppError> {
        let store: SharedRateLimitStore = match &redis_pool {
            Some(pool) => Arc::new(RedisRateLimitStore::new(
                pool.clone(),
                config.redis_key_prefix.clone(),
            )),
            None => Arc::new(InMemoryRateLimitStore::new()),
        };
        let delivery = delivery::delivery_from_config(config)?;

        Ok(Self::with_parts(config, store, delivery, redis_pool))
    }

    pub fn with_parts(
        config: &AppConfig,
        store: SharedRateLimitStore,
        delivery: SharedDelivery,
        redis_pool: Option<RedisPool>,
    ) -> Self {
        AppState {
            contact_handler: ContactHandler::new(store, config.rate_limit_policy(), delivery),
            redis_pool,
            trust_forwarded_headers: config.trust_forwarded_headers,
        }
    }

    pub fn rate_limit_store(&self) -> SharedRateLimitStore {
        self.contact_handler.gate.store().clone()
    }
}

/// The application as served by each worker.
pub fn create_app(
    state: web::Data<AppState>,
    cors_origins: &[String],
    max_body_bytes: usize,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody + use<>>,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    App::new()
        .app_data(state)
        .wrap(cors(cors_origins))
        .wrap(NormalizePath::trim())
        .wrap(TracingLogger::default())
        .configure(|cfg| routes::configure_routes(cfg, max_body_bytes))
}

fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::CONTENT_TYPE])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }

    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
