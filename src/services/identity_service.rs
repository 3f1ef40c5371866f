use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::auth::{AuthError, Identity, TokenSource};
use crate::config;
use crate::database::manager::DatabaseError;
use crate::database::models::{User, USER_COLUMNS};
use crate::types::{CurrentUser, RequestScope};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("User account is deactivated")]
    Inactive,
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid registration")]
    Invalid(HashMap<String, String>),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for IdentityError {
    fn from(error: sqlx::Error) -> Self {
        IdentityError::Database(error.into())
    }
}

/// Match a verified identity to a user row, creating the user on first
/// sight, then load their roles.
pub async fn resolve_user(pool: &PgPool, identity: &Identity, scope: &RequestScope) -> Result<CurrentUser, IdentityError> {
    let mut tx = pool.begin().await.map_err(DatabaseError::from)?;

    let user = match identity.source {
        TokenSource::Local => {
            let id: i32 = identity
                .subject
                .parse()
                .map_err(|_| AuthError::InvalidToken("subject is not a user id".to_string()))?;
            find_user_by_id(&mut tx, id)
                .await?
                .ok_or_else(|| AuthError::InvalidToken(format!("user {} no longer exists", id)))?
        }
        _ => upsert_external(&mut tx, identity, scope).await?,
    };

    if !user.is_active() {
        tracing::warn!("Deactivated user {} attempted to authenticate", user.id);
        return Err(IdentityError::Inactive);
    }

    touch_last_login(&mut tx, user.id).await?;
    let roles = load_roles(&mut tx, user.id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    Ok(user.into_current(identity.source, roles))
}

async fn upsert_external(conn: &mut PgConnection, identity: &Identity, scope: &RequestScope) -> Result<User, IdentityError> {
    let source = identity.source.as_str();

    let linked = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM user_logins l JOIN users u ON u.id = l.user_id \
         WHERE l.token_source = $1 AND l.external_id = $2 \
         AND l.deleted_at IS NULL AND u.deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(source)
    .bind(&identity.subject)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(user) = linked {
        return Ok(user);
    }

    let email = identity
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("token carries no email address".to_string()))?;

    let user = match find_user_by_email(&mut *conn, email).await? {
        Some(user) => {
            tracing::info!("Linking {} login to existing user {}", source, user.id);
            user
        }
        None => {
            let user = sqlx::query_as::<_, User>(&format!(
                "WITH u AS (INSERT INTO users (tenant_id, app_id, org_id, email, first_name, last_name, display_name, photo_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *) SELECT {} FROM u",
                USER_COLUMNS
            ))
            .bind(scope.tenant_id)
            .bind(scope.app_id)
            .bind(scope.org_id)
            .bind(email.to_lowercase())
            .bind(&identity.given_name)
            .bind(&identity.family_name)
            .bind(&identity.display_name)
            .bind(&identity.photo_url)
            .fetch_one(&mut *conn)
            .await?;
            tracing::info!("Created user {} for {} identity", user.id, source);

            if let Some(tenant_id) = scope.tenant_id {
                grant_default_role(&mut *conn, user.id, tenant_id).await?;
            }
            user
        }
    };

    insert_login(&mut *conn, user.id, source, &identity.subject).await?;
    Ok(user)
}

/// Request body of `POST /auth/local/register`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub tenant_id: Option<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Create a user with a local password login
pub async fn register_local(pool: &PgPool, request: RegisterRequest) -> Result<CurrentUser, IdentityError> {
    let email = request.email.trim().to_lowercase();
    let mut errors = HashMap::new();
    if !email.contains('@') {
        errors.insert("email".to_string(), "must be an email address".to_string());
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password".to_string(),
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }
    if !errors.is_empty() {
        return Err(IdentityError::Invalid(errors));
    }

    let mut tx = pool.begin().await.map_err(DatabaseError::from)?;

    if find_user_by_email(&mut tx, &email).await?.is_some() {
        return Err(IdentityError::Conflict(format!("A user with email {} already exists", email)));
    }
    if let Some(tenant_id) = request.tenant_id {
        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM tenants WHERE id = $1 AND deleted_at IS NULL")
            .bind(tenant_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(IdentityError::Invalid(
                [("tenantId".to_string(), "must reference an existing Tenant".to_string())].into(),
            ));
        }
    }

    let hash = hash_password(&request.password)?;
    let user = sqlx::query_as::<_, User>(&format!(
        "WITH u AS (INSERT INTO users (tenant_id, email, first_name, last_name, password_hash) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *) SELECT {} FROM u",
        USER_COLUMNS
    ))
    .bind(request.tenant_id)
    .bind(&email)
    .bind(&request.first_name)
    .bind(&request.last_name)
    .bind(&hash)
    .fetch_one(&mut *tx)
    .await?;

    insert_login(&mut tx, user.id, TokenSource::Local.as_str(), &user.id.to_string()).await?;
    if let Some(tenant_id) = request.tenant_id {
        grant_default_role(&mut tx, user.id, tenant_id).await?;
    }
    let roles = load_roles(&mut tx, user.id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    tracing::info!("Registered local user {}", user.id);
    Ok(user.into_current(TokenSource::Local, roles))
}

/// Check an email / password pair
pub async fn login_local(pool: &PgPool, email: &str, password: &str) -> Result<CurrentUser, IdentityError> {
    let mut tx = pool.begin().await.map_err(DatabaseError::from)?;

    let user = find_user_by_email(&mut tx, email.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(password, hash));
    if !verified {
        tracing::debug!("Local login rejected for user {}", user.id);
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_active() {
        return Err(IdentityError::Inactive);
    }

    touch_last_login(&mut tx, user.id).await?;
    let roles = load_roles(&mut tx, user.id).await?;
    tx.commit().await.map_err(DatabaseError::from)?;

    Ok(user.into_current(TokenSource::Local, roles))
}

async fn find_user_by_id(conn: &mut PgConnection, id: i32) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u WHERE u.id = $1 AND u.deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

async fn find_user_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u WHERE lower(u.email) = lower($1) AND u.deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(conn)
    .await
}

async fn insert_login(conn: &mut PgConnection, user_id: i32, source: &str, external_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO user_logins (user_id, token_source, external_id, created_by) VALUES ($1, $2, $3, $1)")
        .bind(user_id)
        .bind(source)
        .bind(external_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn grant_default_role(conn: &mut PgConnection, user_id: i32, tenant_id: i32) -> Result<(), sqlx::Error> {
    let role_name = &config::config().security.default_role;
    let role_id: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM roles WHERE tenant_id = $1 AND lower(role_name) = lower($2) AND deleted_at IS NULL \
         ORDER BY id LIMIT 1",
    )
    .bind(tenant_id)
    .bind(role_name)
    .fetch_optional(&mut *conn)
    .await?;

    match role_id {
        Some(role_id) => {
            sqlx::query("INSERT INTO user_roles (tenant_id, user_id, role_id, created_by) VALUES ($1, $2, $3, $2)")
                .bind(tenant_id)
                .bind(user_id)
                .bind(role_id)
                .execute(conn)
                .await?;
            tracing::info!("Granted {} to user {}", role_name, user_id);
        }
        None => tracing::debug!("Tenant {} has no {} role to grant", tenant_id, role_name),
    }
    Ok(())
}

async fn touch_last_login(conn: &mut PgConnection, user_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn load_roles(conn: &mut PgConnection, user_id: i32) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT r.role_name FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
         WHERE ur.user_id = $1 AND ur.deleted_at IS NULL AND r.deleted_at IS NULL \
         ORDER BY r.role_name",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
