//! Health Check API Handler

use axum::Json;
use serde_json::{Value, json};

/// GET /health
/// Liveness probe for load balancers and the CLI
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "motormart-api" }))
}
