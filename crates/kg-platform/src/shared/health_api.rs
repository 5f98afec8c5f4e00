//! Health Check Endpoints
//!
//! - /health - combined status with store connectivity
//! - /health/live - liveness probe
//! - /health/ready - readiness probe

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

#[derive(Clone)]
pub struct HealthState {
    pub db: mongodb::Database,
    pub version: String,
    ready: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new(db: mongodb::Database, version: impl Into<String>) -> Self {
        Self {
            db,
            version: version.into(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the service as ready once startup wiring is complete.
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

async fn mongo_check(db: &mongodb::Database) -> HealthCheck {
    let start = std::time::Instant::now();
    match db.run_command(bson::doc! { "ping": 1 }).await {
        Ok(_) => HealthCheck {
            name: "mongodb".to_string(),
            status: HealthStatus::Up,
            message: None,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => HealthCheck {
            name: "mongodb".to_string(),
            status: HealthStatus::Down,
            message: Some(format!("connection failed: {e}")),
            duration_ms: start.elapsed().as_millis() as u64,
        },
    }
}

/// Combined health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<HealthState>) -> Response {
    let check = mongo_check(&state.db).await;
    let status = if check.status == HealthStatus::Down || !state.is_ready() {
        HealthStatus::Down
    } else {
        HealthStatus::Up
    };

    let response = HealthResponse {
        status,
        timestamp: Utc::now(),
        version: state.version.clone(),
        checks: vec![check],
    };

    let status_code = if status == HealthStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response)).into_response()
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = SimpleHealthResponse)
    )
)]
pub async fn get_liveness() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse {
        status: HealthStatus::Up,
    })
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = SimpleHealthResponse),
        (status = 503, description = "Service is not ready", body = SimpleHealthResponse)
    )
)]
pub async fn get_readiness(State(state): State<HealthState>) -> Response {
    let status = if state.is_ready() && mongo_check(&state.db).await.status == HealthStatus::Up {
        HealthStatus::Up
    } else {
        HealthStatus::Down
    };

    let status_code = if status == HealthStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(SimpleHealthResponse { status })).into_response()
}

/// Create the health router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(get_health))
        .route("/live", get(get_liveness))
        .route("/ready", get(get_readiness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Up).unwrap(), "\"UP\"");
        assert_eq!(
            serde_json::to_string(&HealthStatus::Down).unwrap(),
            "\"DOWN\""
        );
    }

    #[test]
    fn test_ready_flag() {
        let ready = Arc::new(AtomicBool::new(false));
        assert!(!ready.load(Ordering::SeqCst));
        ready.store(true, Ordering::SeqCst);
        assert!(ready.load(Ordering::SeqCst));
    }
}
