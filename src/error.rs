// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::manager::DatabaseError;
use crate::filter::error::FilterError;
use crate::observer::error::ObserverError;
use crate::resources::ValidationErrors;
use crate::services::attendance_service::AttendanceError;
use crate::services::identity_service::IdentityError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to the error envelope
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "status": self.status_code(),
            "code": self.error_code(),
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["fieldErrors"] = json!(field_errors);
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(key) => {
                tracing::error!("Missing database configuration: {}", key);
                ApiError::service_unavailable("Database is not configured")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(sqlx_err) => match sqlx_err {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                    tracing::error!("Database unavailable: {}", sqlx_err);
                    ApiError::service_unavailable("Database temporarily unavailable")
                }
                sqlx::Error::RowNotFound => ApiError::not_found("Record not found"),
                sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                    ApiError::conflict("A record with the same unique values already exists")
                }
                sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23503") => {
                    ApiError::validation_error("Referenced record does not exist", None)
                }
                other => {
                    // Log the real error but return generic message
                    tracing::error!("SQLx error: {}", other);
                    ApiError::internal_server_error("Database error occurred")
                }
            },
        }
    }
}

impl From<ObserverError> for ApiError {
    fn from(err: ObserverError) -> Self {
        match err {
            ObserverError::FieldErrors(errors) => ApiError::validation_error("Invalid field values", Some(errors)),
            ObserverError::SecurityError(msg) => ApiError::forbidden(msg),
            ObserverError::NotFound(msg) => ApiError::not_found(msg),
            ObserverError::Database(db) => db.into(),
            ObserverError::TimeoutError(msg) => {
                tracing::error!("Observer timeout: {}", msg);
                ApiError::internal_server_error("Request processing timed out")
            }
            ObserverError::PipelineError(msg) => {
                tracing::error!("Observer pipeline error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::validation_error("Invalid field values", Some(err.into_map()))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ProviderUnavailable(_) => ApiError::bad_gateway(err.to_string()),
            AuthError::SecretNotConfigured | AuthError::TokenGeneration(_) | AuthError::PasswordHash(_) => {
                tracing::error!("Authentication configuration error: {}", err);
                ApiError::internal_server_error("Authentication is not available")
            }
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::Forbidden(msg) => ApiError::forbidden(msg),
            AttendanceError::Invalid(errors) => ApiError::validation_error("Invalid attendance request", Some(errors)),
            AttendanceError::NotFound(msg) => ApiError::not_found(msg),
            err @ AttendanceError::Transition { .. } => ApiError::conflict(err.to_string()),
            AttendanceError::Database(db) => db.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Auth(auth) => auth.into(),
            IdentityError::Inactive => ApiError::forbidden(IdentityError::Inactive.to_string()),
            IdentityError::Conflict(msg) => ApiError::conflict(msg),
            IdentityError::Invalid(errors) => ApiError::validation_error("Invalid registration", Some(errors)),
            IdentityError::Database(db) => db.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_status_and_code() {
        let v = ApiError::not_found("Attendance 4 not found").to_json();
        assert_eq!(v["success"], json!(false));
        assert_eq!(v["error"], json!("Attendance 4 not found"));
        assert_eq!(v["status"], json!(404));
        assert_eq!(v["code"], json!("NOT_FOUND"));
        assert!(v.get("fieldErrors").is_none());
    }

    #[test]
    fn validation_errors_expose_field_map() {
        let mut fields = HashMap::new();
        fields.insert("tenantId".to_string(), "is required".to_string());
        let v = ApiError::validation_error("Invalid field values", Some(fields)).to_json();
        assert_eq!(v["status"], json!(400));
        assert_eq!(v["fieldErrors"]["tenantId"], json!("is required"));
    }

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        assert_eq!(ApiError::from(AuthError::MissingToken).status_code(), 401);
        assert_eq!(ApiError::from(AuthError::ProviderUnavailable("dns".into())).status_code(), 502);
        assert_eq!(ApiError::from(AuthError::SecretNotConfigured).status_code(), 500);
    }

    #[test]
    fn database_errors_hide_internals() {
        let err = ApiError::from(DatabaseError::QueryError("syntax error at or near".into()));
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("syntax"));

        let unavailable = ApiError::from(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(unavailable.status_code(), 503);
    }
}
