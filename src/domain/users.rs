//! User roles and social-connection permissions
//!
//! All queries use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for
//! transactions).

use serde::Serialize;
use sqlx::{Executor, Postgres};

/// Admin role hierarchy. Anything unknown collapses to viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    ContentManager,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::ContentManager => "content_manager",
            UserRole::Viewer => "viewer",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "super_admin" => UserRole::SuperAdmin,
            "content_manager" => UserRole::ContentManager,
            _ => UserRole::Viewer,
        }
    }
}

/// What kinds of social connections a role may create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPermissions {
    pub can_connect_org: bool,
    pub can_connect_personal: bool,
}

/// Pure permission matrix: only super admins touch org-level accounts,
/// viewers connect nothing
pub fn resolve_permissions(role: UserRole) -> ConnectPermissions {
    ConnectPermissions {
        can_connect_org: role == UserRole::SuperAdmin,
        can_connect_personal: matches!(role, UserRole::SuperAdmin | UserRole::ContentManager),
    }
}

/// Resolve a user's role. The configuration-supplied bootstrap allow-list
/// wins over the `admin_users` table; users in neither are viewers.
pub async fn get_user_role<'e, E>(
    executor: E,
    user_id: &str,
    bootstrap_admins: &[String],
) -> Result<UserRole, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if bootstrap_admins.iter().any(|id| id == user_id) {
        return Ok(UserRole::SuperAdmin);
    }

    let row: Option<(String,)> = sqlx::query_as("SELECT role FROM admin_users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(row
        .map(|(role,)| UserRole::from_str(&role))
        .unwrap_or(UserRole::Viewer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_matrix() {
        let super_admin = resolve_permissions(UserRole::SuperAdmin);
        assert!(super_admin.can_connect_org);
        assert!(super_admin.can_connect_personal);

        let manager = resolve_permissions(UserRole::ContentManager);
        assert!(!manager.can_connect_org);
        assert!(manager.can_connect_personal);

        let viewer = resolve_permissions(UserRole::Viewer);
        assert!(!viewer.can_connect_org);
        assert!(!viewer.can_connect_personal);
    }

    #[test]
    fn test_unknown_role_is_viewer() {
        assert_eq!(UserRole::from_str("superuser"), UserRole::Viewer);
        assert_eq!(UserRole::from_str("super_admin"), UserRole::SuperAdmin);
    }
}
