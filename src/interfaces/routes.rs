use actix_web::web;

use crate::handlers::{home::home, json_error::not_found, system::health_check};

mod contact;
mod json_error;

pub fn configure_routes(cfg: &mut web::ServiceConfig, max_body_bytes: usize) {
    json_error::config_routes(cfg, max_body_bytes);

    cfg.service(home);
    cfg.service(health_check);

    cfg.service(
        web::scope("/api")
            .configure(contact::config_routes)
    );

    cfg.default_service(web::to(not_found));
}
