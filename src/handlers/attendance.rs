use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde_json::Value;

use crate::handlers::resource::require_tenant;
use crate::middleware::{ApiResponse, ApiResult};
use crate::resources::registry::ATTENDANCE;
use crate::services::attendance_service::{self, AttendanceRequest};
use crate::state::AppState;
use crate::types::{CurrentUser, RequestScope};

/// POST /Attendance: move one application's attendance for a day to the
/// requested state
pub async fn record_attendance(
    State(state): State<AppState>,
    Extension(scope): Extension<RequestScope>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<AttendanceRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = body?;
    require_tenant(&ATTENDANCE, &scope, &user)?;
    let row = attendance_service::record(&state.pool, &scope, &user, request).await?;
    Ok(ApiResponse::success(row))
}
