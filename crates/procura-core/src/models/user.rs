use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Role name that bypasses permission and role checks.
pub const ADMIN_ROLE: &str = "admin";

/// A user as returned by the Procura backend.
///
/// Treated as an immutable snapshot: the controller replaces the whole
/// record on every update, never mutates individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub permissions: HashSet<String>,
    #[serde(rename = "sessionTimeout", default)]
    pub session_timeout_minutes: Option<i64>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// True if the permission is in the user's set, or the user is an admin.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.contains(permission)
    }

    /// True if the role matches exactly, or the user is an admin.
    pub fn has_role(&self, role: &str) -> bool {
        self.is_admin() || self.role == role
    }
}

/// Login form payload sent to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, permissions: &[&str]) -> UserRecord {
        UserRecord {
            id: 1,
            email: "a@b.com".to_string(),
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            session_timeout_minutes: None,
            email_verified: true,
        }
    }

    #[test]
    fn test_admin_overrides_permissions_and_roles() {
        let admin = user("admin", &[]);
        assert!(admin.has_permission("orders.delete"));
        assert!(admin.has_role("anything"));
    }

    #[test]
    fn test_regular_user_needs_exact_permission() {
        let buyer = user("buyer", &["bids.create"]);
        assert!(buyer.has_permission("bids.create"));
        assert!(!buyer.has_permission("orders.delete"));
        assert!(buyer.has_role("buyer"));
        assert!(!buyer.has_role("supplier"));
    }

    #[test]
    fn test_user_record_deserializes_backend_fields() {
        let json = r#"{
            "id": 7,
            "email": "s@procura.dev",
            "role": "supplier",
            "permissions": ["bids.view"],
            "sessionTimeout": 30,
            "emailVerified": false
        }"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.session_timeout_minutes, Some(30));
        assert!(!user.email_verified);
        assert!(user.permissions.contains("bids.view"));
    }

    #[test]
    fn test_user_record_defaults_optional_fields() {
        let json = r#"{"id": 1, "email": "a@b.com", "role": "buyer"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert!(user.permissions.is_empty());
        assert_eq!(user.session_timeout_minutes, None);
        assert!(!user.email_verified);
    }
}
