// Observer implementations organized by rings
// Each ring handles a specific phase of a write

use crate::observer::pipeline::ObserverPipeline;

// Ring 0: Data Preparation - load existing row, fill scope defaults
#[path = "0/data_preparation.rs"]
pub mod data_preparation;

// Ring 1: Input Validation - field rules, referenced rows
#[path = "1/field_validation.rs"]
pub mod field_validation;
#[path = "1/foreign_key.rs"]
pub mod foreign_key;

// Ring 2: Security - roles and tenant boundaries
#[path = "2/role_guard.rs"]
pub mod role_guard;
#[path = "2/tenant_scope.rs"]
pub mod tenant_scope;
#[path = "2/leave_approval.rs"]
pub mod leave_approval;

// Ring 3: Business rules
#[path = "3/date_range.rs"]
pub mod date_range;

// Ring 4: Enrichment
#[path = "4/audit_fields.rs"]
pub mod audit_fields;

// Ring 5: Database - SQL execution
#[path = "5/sql_executor.rs"]
pub mod sql_executor;

// Ring 6: Post-Database - cascades in the same transaction
#[path = "6/element_property_cascade.rs"]
pub mod element_property_cascade;

pub use audit_fields::AuditFieldsObserver;
pub use data_preparation::DataPreparationObserver;
pub use date_range::DateRangeObserver;
pub use element_property_cascade::ElementPropertyCascadeObserver;
pub use field_validation::FieldValidationObserver;
pub use foreign_key::ForeignKeyObserver;
pub use leave_approval::LeaveApprovalObserver;
pub use role_guard::RoleGuardObserver;
pub use sql_executor::SqlExecutor;
pub use tenant_scope::TenantScopeObserver;

/// Register every built-in observer
pub fn register_defaults(pipeline: &mut ObserverPipeline) {
    pipeline.register_observer(Box::new(DataPreparationObserver));
    pipeline.register_observer(Box::new(FieldValidationObserver));
    pipeline.register_observer(Box::new(ForeignKeyObserver));
    pipeline.register_observer(Box::new(RoleGuardObserver));
    pipeline.register_observer(Box::new(TenantScopeObserver));
    pipeline.register_observer(Box::new(LeaveApprovalObserver));
    pipeline.register_observer(Box::new(DateRangeObserver));
    pipeline.register_observer(Box::new(AuditFieldsObserver));
    pipeline.register_observer(Box::new(SqlExecutor));
    pipeline.register_observer(Box::new(ElementPropertyCascadeObserver));
}
