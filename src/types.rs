/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

use crate::auth::TokenSource;

pub const ROLE_STAFF: &str = "Staff";
pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_SUPER_ADMIN: &str = "SuperAdmin";

/// Database operations supported throughout the system
/// Used by the observer pipeline and the resource handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Select,
}

/// Tenant / app / org scope a request operates in, resolved by the
/// tenant middleware from the query string or `x-*-id` headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestScope {
    pub tenant_id: Option<i32>,
    pub app_id: Option<i32>,
    pub org_id: Option<i32>,
}

impl RequestScope {
    /// Scope value for one of the three scoping fields, by wire name
    pub fn get(&self, field: &str) -> Option<i32> {
        match field {
            "tenantId" => self.tenant_id,
            "appId" => self.app_id,
            "orgId" => self.org_id,
            _ => None,
        }
    }
}

/// The authenticated caller after user upsert and role loading
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
    pub display_name: Option<String>,
    pub tenant_id: Option<i32>,
    pub app_id: Option<i32>,
    pub org_id: Option<i32>,
    pub token_source: TokenSource,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(ROLE_SUPER_ADMIN)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN) || self.is_super_admin()
    }

    /// Admins act with staff privileges as well
    pub fn is_staff(&self) -> bool {
        self.has_role(ROLE_STAFF) || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id: 1,
            email: "a@example.com".into(),
            display_name: None,
            tenant_id: Some(1),
            app_id: None,
            org_id: None,
            token_source: TokenSource::Local,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn role_checks_are_case_insensitive() {
        assert!(user(&["staff"]).is_staff());
        assert!(!user(&["Parent"]).is_staff());
    }

    #[test]
    fn admin_implies_staff_but_not_super_admin() {
        let admin = user(&["Admin"]);
        assert!(admin.is_staff());
        assert!(admin.is_admin());
        assert!(!admin.is_super_admin());
        assert!(user(&["SuperAdmin"]).is_staff());
    }

    #[test]
    fn scope_lookup_by_wire_name() {
        let scope = RequestScope { tenant_id: Some(3), app_id: None, org_id: Some(9) };
        assert_eq!(scope.get("tenantId"), Some(3));
        assert_eq!(scope.get("appId"), None);
        assert_eq!(scope.get("orgId"), Some(9));
        assert_eq!(scope.get("name"), None);
    }
}
