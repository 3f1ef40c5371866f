use serde_json::{Map, Value};
use std::time::Instant;

use crate::observer::traits::{ObserverRing, Operation};
use crate::resources::{ResourceDef, WriteMode};
use crate::types::{CurrentUser, RequestScope};

/// State that flows through the observer pipeline for one write
#[derive(Debug)]
pub struct ObserverContext {
    // Core request data
    pub operation: Operation,
    pub resource: &'static ResourceDef,
    pub mode: WriteMode,
    pub record_id: Option<i32>,

    /// Request body as received
    pub body: Value,

    /// Validated values keyed by wire name (populated by Ring 1)
    pub record: Map<String, Value>,

    /// Row as stored before this write (populated by Ring 0 for update/delete)
    pub existing: Option<Map<String, Value>>,

    // Caller
    pub scope: RequestScope,
    pub actor: CurrentUser,

    /// Row after the write (populated by Ring 5)
    pub result: Option<Value>,

    // Performance tracking
    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,
}

impl ObserverContext {
    fn new(
        operation: Operation,
        resource: &'static ResourceDef,
        mode: WriteMode,
        record_id: Option<i32>,
        body: Value,
        scope: RequestScope,
        actor: CurrentUser,
    ) -> Self {
        Self {
            operation,
            resource,
            mode,
            record_id,
            body,
            record: Map::new(),
            existing: None,
            scope,
            actor,
            result: None,
            start_time: Instant::now(),
            current_ring: None,
        }
    }

    pub fn create(resource: &'static ResourceDef, body: Value, scope: RequestScope, actor: CurrentUser) -> Self {
        Self::new(Operation::Create, resource, WriteMode::Create, None, body, scope, actor)
    }

    /// PUT when `mode` is `Replace`, PATCH when `Patch`
    pub fn update(
        resource: &'static ResourceDef,
        id: i32,
        mode: WriteMode,
        body: Value,
        scope: RequestScope,
        actor: CurrentUser,
    ) -> Self {
        Self::new(Operation::Update, resource, mode, Some(id), body, scope, actor)
    }

    pub fn delete(resource: &'static ResourceDef, id: i32, scope: RequestScope, actor: CurrentUser) -> Self {
        Self::new(Operation::Delete, resource, WriteMode::Patch, Some(id), Value::Null, scope, actor)
    }

    /// Value a field will hold after this write: the new value when
    /// supplied, else the stored one.
    pub fn effective(&self, field: &str) -> Option<&Value> {
        self.record
            .get(field)
            .or_else(|| self.existing.as_ref().and_then(|e| e.get(field)))
            .filter(|v| !v.is_null())
    }

    /// Integer form of [`effective`](Self::effective)
    pub fn effective_i32(&self, field: &str) -> Option<i32> {
        self.effective(field).and_then(Value::as_i64).and_then(|n| i32::try_from(n).ok())
    }

    /// Get total execution time
    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
