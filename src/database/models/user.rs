use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::auth::TokenSource;
use crate::types::CurrentUser;

/// Column list matching [`User`], for hand-written user queries
pub const USER_COLUMNS: &str = "u.id, u.tenant_id, u.app_id, u.org_id, u.email, u.first_name, u.last_name, \
     u.display_name, u.photo_url, u.is_active, u.last_login_at, u.password_hash";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub tenant_id: Option<i32>,
    pub app_id: Option<i32>,
    pub org_id: Option<i32>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: Option<bool>,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
}

impl User {
    /// Missing flag counts as active
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    pub fn into_current(self, token_source: TokenSource, roles: Vec<String>) -> CurrentUser {
        let display_name = self.display_name.or_else(|| {
            let full = [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            (!full.is_empty()).then_some(full)
        });

        CurrentUser {
            id: self.id,
            email: self.email,
            display_name,
            tenant_id: self.tenant_id,
            app_id: self.app_id,
            org_id: self.org_id,
            token_source,
            roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 5,
            tenant_id: Some(1),
            app_id: None,
            org_id: None,
            email: "ana@example.com".into(),
            first_name: Some("Ana".into()),
            last_name: Some("Silva".into()),
            display_name: None,
            photo_url: None,
            is_active: None,
            last_login_at: None,
            password_hash: Some("$argon2id$...".into()),
        }
    }

    #[test]
    fn display_name_falls_back_to_full_name() {
        let current = user().into_current(TokenSource::Local, vec!["Staff".into()]);
        assert_eq!(current.display_name.as_deref(), Some("Ana Silva"));
        assert!(current.is_staff());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ana");
        assert!(user().is_active());
    }
}
