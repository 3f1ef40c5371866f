use sqlx::FromRow;

/// Scope columns of the application an attendance row belongs to
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRef {
    pub id: i32,
    pub tenant_id: i32,
    pub app_id: Option<i32>,
    pub org_id: Option<i32>,
}

/// Current state of one `(application, date)` attendance row
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub id: i32,
    pub attendance_type: i32,
}
