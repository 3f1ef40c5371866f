// handlers/mod.rs - two tiers
//
// Public (no auth):    /, /health, /auth/local/*
// Protected (tokensource + Bearer, scope, user): /auth/whoami, /{Resource}[/:id]

pub mod attendance;
pub mod auth;
pub mod resource;
pub mod system;

use axum::{
    routing::{get, post},
    Router,
};

use crate::resources::RESOURCES;
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/auth/local/register", post(auth::register))
        .route("/auth/local/login", post(auth::login))
}

/// Routes behind the auth, tenant and user middleware
pub fn protected_routes() -> Router<AppState> {
    RESOURCES.iter().fold(
        Router::new().route("/auth/whoami", get(auth::whoami)),
        |router, def| router.merge(resource::resource_routes(*def)),
    )
}
