use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::config::AppInfo;
use crate::repository::HealthCheck;
use crate::response::{self, ApiResponse};

/// Health check endpoint
///
/// Reports the service name, version, environment and current time. Needs no token.
#[get("/health")]
pub async fn health(app: web::Data<AppInfo>) -> impl Responder {
    response::ok(json!({
        "status": "ok",
        "service": app.name,
        "version": app.version,
        "environment": app.environment,
        "timestamp": Utc::now()
    }))
}

/// Readiness check
///
/// 200 while the database answers a ping, 503 with the same body shape otherwise.
#[get("/ready")]
pub async fn ready(app: web::Data<AppInfo>, store: web::Data<dyn HealthCheck>) -> HttpResponse {
    let (status, database) = match store.ping().await {
        Ok(()) => (StatusCode::OK, "up"),
        Err(e) => {
            log::warn!("readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };

    let data = json!({
        "status": if status == StatusCode::OK { "ready" } else { "not ready" },
        "service": app.name,
        "database": database,
        "environment": app.environment,
    });
    let message = if status == StatusCode::OK {
        "success"
    } else {
        "service not ready"
    };

    HttpResponse::build(status).json(ApiResponse {
        code: status.as_u16(),
        message: message.to_string(),
        data: Some(data),
    })
}
