use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::GoogleVerifier;
use crate::observer::ObserverPipeline;

/// Shared handles every request handler and middleware receives
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub google: GoogleVerifier,
    pub pipeline: Arc<ObserverPipeline>,
}

impl AppState {
    /// State with the configured Google verifier and every built-in observer
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            google: GoogleVerifier::from_config(),
            pipeline: Arc::new(ObserverPipeline::with_defaults()),
        }
    }
}
