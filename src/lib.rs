pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod observer;
pub mod resources;
pub mod services;
pub mod state;
pub mod types;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware::from_fn_with_state, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// The complete HTTP application
pub fn app(state: AppState) -> Router {
    let api = &config::config().api;

    // route_layer: the last layer added runs first
    let protected = handlers::protected_routes()
        .route_layer(from_fn_with_state(state.clone(), middleware::validate_user_middleware))
        .route_layer(from_fn_with_state(state.clone(), middleware::validate_tenant_middleware))
        .route_layer(from_fn_with_state(state.clone(), middleware::token_auth_middleware));

    let mut router = Router::new()
        .merge(handlers::public_routes())
        .merge(protected)
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes));

    if let Some(cors) = cors_layer() {
        router = router.layer(cors);
    }
    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer() -> Option<CorsLayer> {
    let security = &config::config().security;
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        app(AppState::new(pool))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_lists_resources() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["formData"]["resources"].as_array().unwrap().iter().any(|r| r == "Attendance"));
    }

    #[tokio::test]
    async fn resources_require_token_source() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/Application")
                    .header("authorization", "Bearer abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["status"], 401);
    }

    #[tokio::test]
    async fn resources_require_bearer_token() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/Attendance/3")
                    .header("tokensource", "local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forged_local_token_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/auth/whoami")
                    .header("tokensource", "local")
                    .header("authorization", "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let response = test_app()
            .oneshot(Request::builder().uri("/Nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_unavailable_database() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn malformed_login_body_is_bad_request() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/local/login")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"email\":"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_JSON");
    }
}
