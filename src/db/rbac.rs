use std::collections::BTreeSet;

use sqlx::SqlitePool;

use crate::authz::Permission;
use crate::errors::{AppError, AppResult};
use crate::models::rbac::{PermissionRecord, Role};

// =============================================================================
// ROLES
// =============================================================================

pub async fn list_roles(pool: &SqlitePool) -> AppResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>("SELECT id, name, is_deleted FROM roles WHERE is_deleted = 0 ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(roles)
}

pub async fn find_role(pool: &SqlitePool, role_id: i64) -> AppResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT id, name, is_deleted FROM roles WHERE id = ? AND is_deleted = 0")
        .bind(role_id)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn find_role_by_name(pool: &SqlitePool, name: &str) -> AppResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT id, name, is_deleted FROM roles WHERE name = ? AND is_deleted = 0")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn create_role(pool: &SqlitePool, name: &str) -> AppResult<Role> {
    let id = sqlx::query("INSERT INTO roles (name, is_deleted) VALUES (?, 0)")
        .bind(name)
        .execute(pool)
        .await
        .map_err(|err| {
            if super::is_unique_violation(&err) {
                AppError::conflict(format!("role {name} already exists"))
            } else {
                AppError::Database(err)
            }
        })?
        .last_insert_rowid();

    Ok(Role {
        id,
        name: name.to_string(),
        is_deleted: false,
    })
}

/// Soft delete. Returns false when the role does not exist.
pub async fn soft_delete_role(pool: &SqlitePool, role_id: i64) -> AppResult<bool> {
    let result = sqlx::query("UPDATE roles SET is_deleted = 1 WHERE id = ? AND is_deleted = 0")
        .bind(role_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// PERMISSIONS
// =============================================================================

pub async fn list_permissions(pool: &SqlitePool) -> AppResult<Vec<PermissionRecord>> {
    let permissions = sqlx::query_as::<_, PermissionRecord>(
        "SELECT id, name, is_deleted FROM permissions WHERE is_deleted = 0 ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(permissions)
}

pub async fn find_permission(pool: &SqlitePool, permission_id: i64) -> AppResult<Option<PermissionRecord>> {
    let permission = sqlx::query_as::<_, PermissionRecord>(
        "SELECT id, name, is_deleted FROM permissions WHERE id = ? AND is_deleted = 0",
    )
    .bind(permission_id)
    .fetch_optional(pool)
    .await?;
    Ok(permission)
}

// =============================================================================
// ROLE <-> PERMISSION
// =============================================================================

pub async fn role_permissions(pool: &SqlitePool, role_id: i64) -> AppResult<Vec<PermissionRecord>> {
    let permissions = sqlx::query_as::<_, PermissionRecord>(
        r#"
        SELECT p.id, p.name, p.is_deleted
        FROM permissions p
        INNER JOIN role_permissions rp ON rp.permission_id = p.id
        WHERE rp.role_id = ? AND p.is_deleted = 0
        ORDER BY p.name
        "#,
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;
    Ok(permissions)
}

/// Returns false when the grant already existed.
pub async fn assign_permission(pool: &SqlitePool, role_id: i64, permission_id: i64) -> AppResult<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
        .bind(role_id)
        .bind(permission_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn revoke_permission(pool: &SqlitePool, role_id: i64, permission_id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
        .bind(role_id)
        .bind(permission_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn role_grant_count(pool: &SqlitePool, role_id: i64) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM role_permissions WHERE role_id = ?")
        .bind(role_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Link `role_id` to every stored permission named in `permissions`. Existing
/// grants are left alone. Returns the number of new grants.
pub async fn grant_permissions(pool: &SqlitePool, role_id: i64, permissions: &[Permission]) -> AppResult<u64> {
    let mut tx = pool.begin().await?;
    let mut granted = 0;

    for permission in permissions {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) \
             SELECT ?, id FROM permissions WHERE name = ?",
        )
        .bind(role_id)
        .bind(permission.as_str())
        .execute(&mut *tx)
        .await?;
        granted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(granted)
}

// =============================================================================
// USER <-> ROLE
// =============================================================================

pub async fn user_roles(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        r#"
        SELECT r.id, r.name, r.is_deleted
        FROM roles r
        INNER JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = ? AND r.is_deleted = 0
        ORDER BY r.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// Returns false when the user already held the role.
pub async fn assign_role(pool: &SqlitePool, user_id: i64, role_id: i64) -> AppResult<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn revoke_role(pool: &SqlitePool, user_id: i64, role_id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Distinct permission names reachable from the user's live roles.
pub async fn effective_permissions(pool: &SqlitePool, user_id: i64) -> AppResult<BTreeSet<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT p.name
        FROM permissions p
        INNER JOIN role_permissions rp ON rp.permission_id = p.id
        INNER JOIN roles r ON r.id = rp.role_id
        INNER JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = ? AND r.is_deleted = 0 AND p.is_deleted = 0
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(names.into_iter().collect())
}
