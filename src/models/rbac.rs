use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::events::{Loggable, Severity};
use crate::models::user::DbUser;

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_deleted: bool,
}

impl Loggable for Role {
    fn entity_type() -> &'static str { "role" }
    fn subject_id(&self) -> Option<i64> { Some(self.id) }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "Support")]
    pub name: String,
}

// =============================================================================
// PERMISSION (persisted mirror of the catalog)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub id: i64,
    pub name: String,
    pub is_deleted: bool,
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub user_id: i64,
    pub role_id: i64,
}

impl Loggable for UserRole {
    fn entity_type() -> &'static str { "user_role" }
    fn subject_id(&self) -> Option<i64> { Some(self.user_id) }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub role_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub role_id: i64,
    pub permission_id: i64,
}

impl Loggable for RolePermission {
    fn entity_type() -> &'static str { "role_permission" }
    fn subject_id(&self) -> Option<i64> { Some(self.role_id) }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionToRoleRequest {
    pub permission_id: i64,
}

// =============================================================================
// RESOLVED GRANTS
// =============================================================================

/// A role together with the names of the permissions it bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub name: String,
    pub permissions: Vec<String>,
}

/// A user with every role and permission reachable through its role joins.
#[derive(Debug, Clone)]
pub struct UserGrants {
    pub user: DbUser,
    pub roles: Vec<RoleGrant>,
}

impl UserGrants {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|role| role.name.clone()).collect()
    }

    /// Union of permissions across all roles, duplicates collapsed.
    pub fn permission_names(&self) -> BTreeSet<String> {
        self.roles
            .iter()
            .flat_map(|role| role.permissions.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermissions {
    pub user_id: i64,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}
