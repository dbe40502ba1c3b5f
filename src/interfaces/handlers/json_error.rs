use std::fmt;

use actix_web::{http::StatusCode, HttpRequest, HttpResponse, ResponseError};

use crate::constants::{MSG_INVALID_REQUEST, MSG_PAYLOAD_TOO_LARGE};

pub fn json_error(status: StatusCode, error: &str, details: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": error,
        "details": details
    }))
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, "Not found", req.path())
}

/// The request body could not be read (too large, broken stream, ...).
/// Keeps the extractor's status but answers in JSON.
#[derive(Debug)]
pub struct BodyError {
    message: &'static str,
    details: String,
    status: StatusCode,
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.details)
    }
}

impl ResponseError for BodyError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status, self.message, &self.details)
    }
}

impl From<actix_web::Error> for BodyError {
    fn from(err: actix_web::Error) -> Self {
        let status = err.as_response_error().status_code();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            MSG_PAYLOAD_TOO_LARGE
        } else {
            MSG_INVALID_REQUEST
        };

        BodyError {
            message,
            details: err.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, error::PayloadError};

    #[actix_rt::test]
    async fn overflow_keeps_413_and_renders_json() {
        let err = BodyError::from(actix_web::Error::from(PayloadError::Overflow));

        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], MSG_PAYLOAD_TOO_LARGE);
    }

    #[actix_rt::test]
    async fn other_body_errors_use_generic_message() {
        let err = BodyError::from(actix_web::Error::from(PayloadError::Incomplete(None)));

        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], MSG_INVALID_REQUEST);
    }
}
