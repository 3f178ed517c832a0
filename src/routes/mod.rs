//! Gateway wiring: everything the API answers lives under `/api`.

use actix_web::{get, web, HttpResponse};

use crate::error::json_error_handler;
use crate::handlers;
use crate::types::{ApiInfo, ApiResponse};

pub mod health;

#[get("")]
async fn index() -> HttpResponse {
    HttpResponse::Ok().json(api_info())
}

#[get("/")]
async fn index_slash() -> HttpResponse {
    HttpResponse::Ok().json(api_info())
}

fn api_info() -> ApiInfo {
    ApiInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::failure("API endpoint not found"))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(index)
            .service(index_slash)
            .service(health::health)
            .configure(handlers::auth::configure)
            .configure(handlers::services::configure)
            .configure(handlers::bookings::configure)
            .configure(handlers::gallery::configure)
            .configure(handlers::settings::configure)
            .default_service(web::to(not_found)),
    );
}

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_error_handler)
}
