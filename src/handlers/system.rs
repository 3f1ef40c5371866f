use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::resources::RESOURCES;
use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    let resources: Vec<&str> = RESOURCES.iter().map(|r| r.name).collect();

    Json(json!({
        "success": true,
        "formData": {
            "name": "Creche API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant school and childcare management backend",
            "endpoints": {
                "public": ["/", "/health", "/auth/local/register", "/auth/local/login"],
                "auth": "/auth/whoami (tokensource + Bearer)",
                "resources": "/{Resource}[/:id] (tokensource + Bearer)",
            },
            "resources": resources,
        }
    }))
}

/// GET /health: 200 when the database answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "formData": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "status": 503,
                    "code": "SERVICE_UNAVAILABLE",
                    "formData": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
