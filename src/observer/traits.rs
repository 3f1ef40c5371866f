use async_trait::async_trait;
use sqlx::PgConnection;
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::resources::ResourceDef;

pub use crate::types::Operation;

/// Observer rings with semantic meaning, executed in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0,    // Load existing data, merge scope defaults
    InputValidation = 1,    // Field validation, referenced rows
    Security = 2,           // Roles, tenant boundaries
    Business = 3,           // Domain rules
    Enrichment = 4,         // Audit columns, computed fields
    Database = 5,           // SQL execution
    PostDatabase = 6,       // Cascades inside the same transaction
}

impl ObserverRing {
    /// Rings run for an operation type
    pub fn for_operation(operation: Operation) -> Vec<Self> {
        use ObserverRing::*;

        match operation {
            Operation::Select => vec![],
            Operation::Create | Operation::Update | Operation::Delete => vec![
                DataPreparation, InputValidation, Security, Business,
                Enrichment, Database, PostDatabase,
            ],
        }
    }
}

/// A pipeline stage. Every write runs each applicable observer in ring
/// order on the request's transaction.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    /// Which ring this observer belongs to
    fn ring(&self) -> ObserverRing;

    /// Check if observer applies to this operation
    fn applies_to_operation(&self, op: Operation) -> bool;

    /// Check if observer applies to this resource
    fn applies_to_resource(&self, _resource: &ResourceDef) -> bool {
        true
    }

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }

    async fn execute(&self, ctx: &mut ObserverContext, conn: &mut PgConnection) -> Result<(), ObserverError>;
}
