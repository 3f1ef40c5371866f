use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::time::Instant;
use tokio::time::timeout;

use crate::database::manager::DatabaseError;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing};

/// Executes observers in ring order, one transaction per write
pub struct ObserverPipeline {
    // Observer registry by ring, each list sorted by priority
    observers: HashMap<ObserverRing, Vec<Box<dyn Observer>>>,
}

impl ObserverPipeline {
    /// Create new observer pipeline with empty observer registry
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    /// Pipeline with every built-in observer registered
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        crate::observer::implementations::register_defaults(&mut pipeline);
        pipeline
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        let ring = observer.ring();
        let name = observer.name();
        let list = self.observers.entry(ring).or_default();
        list.push(observer);
        list.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    /// Run a create / update / delete through every ring and commit.
    /// Any observer error rolls the transaction back.
    pub async fn execute(&self, pool: &PgPool, mut ctx: ObserverContext) -> Result<Value, ObserverError> {
        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;

        tracing::info!(
            "Observer pipeline starting: operation={:?}, resource={}, id={:?}",
            ctx.operation, ctx.resource.name, ctx.record_id
        );

        for ring in ObserverRing::for_operation(ctx.operation) {
            ctx.current_ring = Some(ring);
            self.execute_ring(ring, &mut ctx, &mut tx).await?;
        }

        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::debug!(
            "Observer pipeline finished: resource={} in {:?}",
            ctx.resource.name,
            ctx.execution_time()
        );

        ctx.result
            .ok_or_else(|| ObserverError::PipelineError(format!("no SQL executor produced a {} row", ctx.resource.name)))
    }

    /// Execute observers in a specific ring
    async fn execute_ring(
        &self,
        ring: ObserverRing,
        ctx: &mut ObserverContext,
        conn: &mut PgConnection,
    ) -> Result<(), ObserverError> {
        let Some(observers) = self.observers.get(&ring) else {
            tracing::trace!("No observers registered for ring {:?}", ring);
            return Ok(());
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) || !observer.applies_to_resource(ctx.resource) {
                continue;
            }

            let observer_start = Instant::now();
            let result = timeout(observer.timeout(), observer.execute(ctx, &mut *conn)).await;
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::debug!("Observer: {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::warn!("Observer: {} failed in {:?}: {}", observer.name(), execution_time, error);
                    return Err(error);
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    return Err(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for ObserverPipeline {
    fn default() -> Self {
        Self::new()
    }
}
