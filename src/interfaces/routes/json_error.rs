use actix_web::web;

/// Body size limit for every extractor. Failures while reading the body are
/// rendered by [`BodyError`](crate::handlers::json_error::BodyError).
pub fn config_routes(cfg: &mut web::ServiceConfig, max_body_bytes: usize) {
    cfg.app_data(web::PayloadConfig::new(max_body_bytes));
}
