//! Keeps the persisted `permissions` table set-equal to [`Permission::ALL`].
//!
//! Runs once during startup, before the listener binds. It is not safe to run
//! concurrently with itself.

use std::collections::HashSet;

use sqlx::SqlitePool;

use super::permission::Permission;
use crate::errors::AppResult;
use crate::models::rbac::PermissionRecord;

/// Grants the `User` role receives when it has none yet.
pub const DEFAULT_USER_PERMISSIONS: &[Permission] = &[
    Permission::CategoryGetAll,
    Permission::CategoryGetById,
    Permission::ProductGetAll,
    Permission::ProductGetById,
    Permission::ReviewGetAll,
    Permission::ReviewGetById,
    Permission::ReviewCreate,
    Permission::CartCreate,
    Permission::CartGetById,
    Permission::CartUpdate,
    Permission::CartItemCreate,
    Permission::CartItemGetAll,
    Permission::CartItemGetById,
    Permission::CartItemUpdate,
    Permission::CartItemDelete,
    Permission::WishListCreate,
    Permission::WishListGetAll,
    Permission::WishListGetById,
    Permission::WishListDelete,
    Permission::OrderCreate,
    Permission::OrderGetAll,
    Permission::OrderGetById,
    Permission::OrderItemGetAll,
    Permission::OrderItemGetById,
    Permission::ShippingAddressCreate,
    Permission::ShippingAddressGetAll,
    Permission::ShippingAddressGetById,
    Permission::ShippingAddressUpdate,
    Permission::PaymentCreate,
    Permission::PaymentGetById,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Catalog members whose rows had been soft-deleted and were re-enabled.
    pub restored: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.restored.is_empty()
    }
}

/// Set difference between the catalog and the stored rows: `(to_add, to_remove)`.
pub fn diff(stored: &[PermissionRecord]) -> (Vec<&'static str>, Vec<PermissionRecord>) {
    let catalog: HashSet<&'static str> = Permission::ALL.iter().map(|p| p.as_str()).collect();
    let stored_names: HashSet<&str> = stored.iter().map(|p| p.name.as_str()).collect();

    let to_add = Permission::ALL
        .iter()
        .map(|p| p.as_str())
        .filter(|name| !stored_names.contains(name))
        .collect();

    let to_remove = stored
        .iter()
        .filter(|p| !catalog.contains(p.name.as_str()))
        .cloned()
        .collect();

    (to_add, to_remove)
}

/// Stored rows for current catalog members that are flagged deleted.
pub fn disabled_members(stored: &[PermissionRecord]) -> Vec<PermissionRecord> {
    stored
        .iter()
        .filter(|p| p.is_deleted && p.name.parse::<Permission>().is_ok())
        .cloned()
        .collect()
}

/// Insert missing catalog members and delete stale rows. Nothing is written
/// when both sides already agree.
pub async fn reconcile(pool: &SqlitePool) -> AppResult<ReconcileReport> {
    let stored = sqlx::query_as::<_, PermissionRecord>("SELECT id, name, is_deleted FROM permissions")
        .fetch_all(pool)
        .await?;

    let (to_add, to_remove) = diff(&stored);
    let to_restore = disabled_members(&stored);
    if to_add.is_empty() && to_remove.is_empty() && to_restore.is_empty() {
        tracing::info!(count = stored.len(), "permissions are already in sync");
        return Ok(ReconcileReport::default());
    }

    let mut tx = pool.begin().await?;

    for name in &to_add {
        sqlx::query("INSERT INTO permissions (name, is_deleted) VALUES (?, 0)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    for record in &to_remove {
        sqlx::query("DELETE FROM permissions WHERE id = ?")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;
    }

    for record in &to_restore {
        sqlx::query("UPDATE permissions SET is_deleted = 0 WHERE id = ?")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    if !to_add.is_empty() {
        tracing::info!(count = to_add.len(), "permissions added");
    }
    if !to_remove.is_empty() {
        tracing::info!(count = to_remove.len(), "stale permissions removed");
    }
    if !to_restore.is_empty() {
        tracing::info!(count = to_restore.len(), "disabled permissions re-enabled");
    }

    Ok(ReconcileReport {
        added: to_add.into_iter().map(str::to_string).collect(),
        removed: to_remove.into_iter().map(|record| record.name).collect(),
        restored: to_restore.into_iter().map(|record| record.name).collect(),
    })
}
