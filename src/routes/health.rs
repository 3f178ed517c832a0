// Health check endpoint
use actix_web::{get, web, HttpResponse};

use crate::clock;
use crate::config::AppConfig;
use crate::types::HealthResponse;

#[get("/health")]
pub async fn health(cfg: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".to_string(),
        timestamp: clock::now(),
        environment: cfg.server.environment.clone(),
    })
}
