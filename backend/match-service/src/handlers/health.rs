use actix_web::{get, HttpResponse};
use serde_json::json;

/// GET /health
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "match-service",
    }))
}
