use actix_web::{post, web, HttpRequest, HttpResponse, Responder, ResponseError};
use chrono::Utc;

use crate::{handlers::json_error::BodyError, utils::get_client_ip::get_client_ip, AppState};

/// The body is read raw: the attempt is counted before it is parsed.
#[post("/contact")]
pub async fn submit_contact(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Result<web::Bytes, BodyError>,
) -> impl Responder {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Contact request body rejected");
            return e.error_response();
        }
    };
    let client_key = get_client_ip(&req, state.trust_forwarded_headers);

    match state.contact_handler.submit(&body, &client_key, Utc::now()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.to_http_response(),
    }
}
