use std::collections::HashMap;
use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::resources::ValidationErrors;

/// Observer system errors with structured error types
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Invalid field values")]
    FieldErrors(HashMap<String, String>),

    #[error("Security error: {0}")]
    SecurityError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error(transparent)]
    Database(DatabaseError),

    #[error("Pipeline execution failed: {0}")]
    PipelineError(String),
}

/// Convert from database errors
impl From<DatabaseError> for ObserverError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(msg) => ObserverError::NotFound(msg),
            other => ObserverError::Database(other),
        }
    }
}

impl From<sqlx::Error> for ObserverError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(error).into()
    }
}

impl From<ValidationErrors> for ObserverError {
    fn from(errors: ValidationErrors) -> Self {
        ObserverError::FieldErrors(errors.into_map())
    }
}
