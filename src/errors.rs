use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::{self, ContentType}, StatusCode},
    HttpResponse
};
use derive_more::Display;
use serde::Serialize;

use crate::constants::{MSG_INTERNAL_ERROR, MSG_INVALID_REQUEST, MSG_RATE_LIMITED};

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    RateLimited { retry_after_secs: Option<u64> },
    Spam,
    MalformedBody(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::RateLimited { retry_after_secs: Some(secs) } => {
                write!(f, "Rate limited: retry after {}s", secs)
            }
            AppError::RateLimited { retry_after_secs: None } => write!(f, "Rate limited"),
            AppError::Spam => write!(f, "Spam detected"),
            AppError::MalformedBody(msg) => write!(f, "Malformed request body: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        builder.insert_header(ContentType::json());

        let body = match self {
            AppError::ValidationError(errors) => {
                let first = errors.first();
                serde_json::json!({
                    "error": first.map(|e| e.message.as_str()).unwrap_or(MSG_INVALID_REQUEST),
                    "field": first.map(|e| e.field.as_str()),
                    "details": errors
                })
            }
            AppError::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    builder.insert_header((header::RETRY_AFTER, secs.to_string()));
                }
                serde_json::json!({"error": MSG_RATE_LIMITED})
            }
            AppError::Spam => serde_json::json!({"error": MSG_INVALID_REQUEST}),
            AppError::MalformedBody(_) | AppError::InternalError(_) => {
                tracing::error!(error = %self, "Contact API error");
                serde_json::json!({"error": MSG_INTERNAL_ERROR})
            }
        };

        builder.json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Spam => StatusCode::BAD_REQUEST,
            AppError::MalformedBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        self.error_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum StoreError {
    #[display("Redis connection failed: {_0}")]
    RedisConnection(String),

    #[display("Redis operation failed: {_0}")]
    RedisOperation(String),

    #[display("Unexpected rate limit state: {_0}")]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        StoreError::RedisConnection(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::RedisOperation(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum DeliveryError {
    #[display("Delivery transport failed: {_0}")]
    Transport(String),

    #[display("Delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[display("Delivery not configured: {_0}")]
    NotConfigured(String),
}

impl std::error::Error for DeliveryError {}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
