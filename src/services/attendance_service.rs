use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::fmt;

use crate::database::manager::DatabaseError;
use crate::database::models::{ApplicationRef, AttendanceRow};
use crate::database::repository::{insert_row, update_row};
use crate::resources::registry::ATTENDANCE;
use crate::types::{CurrentUser, RequestScope};

/// Attendance states stored in `attendance_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AttendanceState {
    Absent = 0,
    CheckInPending = 1,
    CheckedIn = 2,
    CheckOutPending = 3,
    CheckedOut = 4,
    OnLeave = 5,
    Holiday = 6,
}

impl TryFrom<i32> for AttendanceState {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        use AttendanceState::*;
        Ok(match code {
            0 => Absent,
            1 => CheckInPending,
            2 => CheckedIn,
            3 => CheckOutPending,
            4 => CheckedOut,
            5 => OnLeave,
            6 => Holiday,
            other => return Err(other),
        })
    }
}

impl fmt::Display for AttendanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Timestamps a transition sets on the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Nothing,
    CheckIn,
    CheckOut,
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Forbidden(String),
    #[error("Invalid attendance request")]
    Invalid(HashMap<String, String>),
    #[error("{0}")]
    NotFound(String),
    #[error("Cannot move attendance from {from} to {to}")]
    Transition { from: String, to: AttendanceState },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AttendanceError {
    fn from(error: sqlx::Error) -> Self {
        AttendanceError::Database(error.into())
    }
}

impl AttendanceError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AttendanceError::Invalid([(field.to_string(), reason.into())].into())
    }
}

/// Who is asking for a transition
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub is_staff: bool,
    pub has_auth_code: bool,
}

/// Decide whether `current -> target` is allowed and what it stamps
pub fn transition(
    current: Option<AttendanceState>,
    target: AttendanceState,
    requester: Requester,
) -> Result<Stamp, AttendanceError> {
    use AttendanceState::*;

    let needs_staff = matches!(target, CheckedIn | CheckedOut | Absent | OnLeave | Holiday);
    if needs_staff && !requester.is_staff {
        return Err(AttendanceError::Forbidden(format!("Only Staff may mark attendance {}", target)));
    }
    if matches!(target, CheckInPending | CheckOutPending) && !requester.has_auth_code {
        return Err(AttendanceError::invalid("authCode", format!("is required to request {}", target)));
    }

    let stamp = match (current, target) {
        (None | Some(Absent), CheckInPending) => Stamp::CheckIn,
        (Some(CheckInPending), CheckedIn) => Stamp::Nothing,
        (None | Some(Absent), CheckedIn) => Stamp::CheckIn,
        (Some(CheckedIn), CheckOutPending) => Stamp::CheckOut,
        (Some(CheckedIn), CheckedOut) => Stamp::CheckOut,
        (Some(CheckOutPending), CheckedOut) => Stamp::Nothing,
        (None | Some(Absent | OnLeave | Holiday), Absent | OnLeave | Holiday) => Stamp::Nothing,
        (from, to) => {
            return Err(AttendanceError::Transition {
                from: from.map(|s| s.to_string()).unwrap_or_else(|| "None".to_string()),
                to,
            });
        }
    };
    Ok(stamp)
}

/// Body of `POST /Attendance`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub application_id: Option<i32>,
    pub auth_code: Option<String>,
    pub attendance_type: i32,
    pub attendance_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Apply a requested attendance state to the `(application, date)` row,
/// creating it when absent. Runs in its own transaction.
pub async fn record(
    pool: &PgPool,
    scope: &RequestScope,
    actor: &CurrentUser,
    request: AttendanceRequest,
) -> Result<Value, AttendanceError> {
    let target = AttendanceState::try_from(request.attendance_type)
        .map_err(|_| AttendanceError::invalid("attendanceType", "must be between 0 and 6"))?;
    let tenant_id = scope
        .tenant_id
        .or(actor.tenant_id)
        .ok_or_else(|| AttendanceError::invalid("tenantId", "is required"))?;
    let date = request.attendance_date.unwrap_or_else(|| Utc::now().date_naive());
    let auth_code = request.auth_code.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let mut tx = pool.begin().await.map_err(DatabaseError::from)?;

    let application = resolve_application(&mut tx, tenant_id, request.application_id, auth_code).await?;

    let current = sqlx::query_as::<_, AttendanceRow>(
        "SELECT id, attendance_type FROM attendances \
         WHERE application_id = $1 AND attendance_date = $2 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(application.id)
    .bind(date)
    .fetch_optional(&mut *tx)
    .await?;

    let current_state = current
        .as_ref()
        .map(|row| AttendanceState::try_from(row.attendance_type))
        .transpose()
        .map_err(|code| AttendanceError::Database(DatabaseError::QueryError(format!("stored attendance type {}", code))))?;

    let requester = Requester { is_staff: actor.is_staff(), has_auth_code: auth_code.is_some() };
    let stamp = transition(current_state, target, requester)?;

    let mut values = Map::new();
    values.insert("attendanceType".to_string(), Value::from(target as i32));
    values.insert("updatedBy".to_string(), Value::from(actor.id));
    if let Some(notes) = request.notes {
        values.insert("notes".to_string(), Value::String(notes));
    }
    let now = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    match stamp {
        Stamp::CheckIn => {
            values.insert("checkInTime".to_string(), now);
            values.insert("checkInBy".to_string(), Value::from(actor.id));
        }
        Stamp::CheckOut => {
            values.insert("checkOutTime".to_string(), now);
            values.insert("checkOutBy".to_string(), Value::from(actor.id));
        }
        Stamp::Nothing => {}
    }

    let row = write(&mut tx, current, &application, date, values, actor.id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    tracing::info!(
        "Attendance for application {} on {}: {} -> {}",
        application.id,
        date,
        current_state.map(|s| s.to_string()).unwrap_or_else(|| "None".to_string()),
        target
    );
    Ok(row)
}

async fn resolve_application(
    conn: &mut PgConnection,
    tenant_id: i32,
    application_id: Option<i32>,
    auth_code: Option<&str>,
) -> Result<ApplicationRef, AttendanceError> {
    const COLUMNS: &str = "SELECT id, tenant_id, app_id, org_id FROM applications";

    if let Some(code) = auth_code {
        let found = sqlx::query_as::<_, ApplicationRef>(&format!(
            "{} WHERE auth_code = $1 AND tenant_id = $2 AND deleted_at IS NULL",
            COLUMNS
        ))
        .bind(code)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AttendanceError::invalid("authCode", "does not match an application"))?;

        if application_id.is_some_and(|id| id != found.id) {
            return Err(AttendanceError::invalid("authCode", "does not match applicationId"));
        }
        return Ok(found);
    }

    let id = application_id.ok_or_else(|| AttendanceError::invalid("applicationId", "is required"))?;
    sqlx::query_as::<_, ApplicationRef>(&format!(
        "{} WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
        COLUMNS
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AttendanceError::NotFound(format!("Application {} not found", id)))
}

async fn write(
    conn: &mut PgConnection,
    current: Option<AttendanceRow>,
    application: &ApplicationRef,
    date: NaiveDate,
    mut values: Map<String, Value>,
    actor_id: i32,
) -> Result<Value, AttendanceError> {
    if let Some(row) = current {
        return Ok(update_row(conn, &ATTENDANCE, row.id, &values).await?);
    }

    values.insert("tenantId".to_string(), Value::from(application.tenant_id));
    values.insert("appId".to_string(), application.app_id.map(Value::from).unwrap_or(Value::Null));
    values.insert("orgId".to_string(), application.org_id.map(Value::from).unwrap_or(Value::Null));
    values.insert("applicationId".to_string(), Value::from(application.id));
    values.insert("attendanceDate".to_string(), Value::String(date.format("%Y-%m-%d").to_string()));
    values.insert("createdBy".to_string(), Value::from(actor_id));
    Ok(insert_row(conn, &ATTENDANCE, &values).await?)
}
