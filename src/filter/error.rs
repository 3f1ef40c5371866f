use thiserror::Error;

/// Rejections raised while turning list parameters into SQL
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Unknown field: {0}")]
    InvalidColumn(String),

    #[error("Invalid where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid query parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}
