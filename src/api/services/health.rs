use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{Responder, Result as ActixResult, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, trace};

use crate::api::AppState;

use super::admin::{ErrorCode, json_response};

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage_backend: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

/// GET /health
pub async fn health_check(state: web::Data<AppState>) -> ActixResult<impl Responder> {
    trace!("Received health check request");

    let healthy = match tokio::time::timeout(Duration::from_secs(5), state.storage.ping()).await
    {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Storage health check failed: {}", e);
            false
        }
        Err(_) => {
            error!("Storage health check timeout");
            false
        }
    };

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        storage_backend: state.storage.backend_name().to_string(),
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    };

    Ok(if healthy {
        json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(body))
    } else {
        json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable,
            "Storage unavailable",
            Some(body),
        )
    })
}

pub fn health_routes() -> actix_web::Scope {
    web::scope("/health").route("", web::get().to(health_check))
}
