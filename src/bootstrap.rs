//! Startup sequence run before the listener binds: permission catalog
//! reconciliation, role grant seeding, admin account seeding.

use sqlx::SqlitePool;

use crate::authz::catalog::{self, ReconcileReport, DEFAULT_USER_PERMISSIONS};
use crate::authz::{roles, Permission};
use crate::config::AdminSeed;
use crate::db;
use crate::db::users::NewUser;
use crate::errors::{AppError, AppResult};
use crate::password::{generate_salt, PasswordHasher};

#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub catalog: ReconcileReport,
    pub admin_grants_added: u64,
    pub user_grants_added: u64,
    pub admin_created: bool,
}

pub async fn run(pool: &SqlitePool, admin: &AdminSeed) -> AppResult<BootstrapReport> {
    let catalog = catalog::reconcile(pool).await?;
    let (admin_grants_added, user_grants_added) = seed_role_grants(pool).await?;
    let admin_created = seed_admin(pool, admin).await?;

    Ok(BootstrapReport {
        catalog,
        admin_grants_added,
        user_grants_added,
        admin_created,
    })
}

/// `Admin` receives the whole catalog on every start. `User` receives the
/// customer defaults only while it has no grants at all.
pub async fn seed_role_grants(pool: &SqlitePool) -> AppResult<(u64, u64)> {
    let admin = required_role(pool, roles::ADMIN).await?;
    let admin_added = db::rbac::grant_permissions(pool, admin.id, Permission::ALL).await?;
    if admin_added > 0 {
        tracing::info!(count = admin_added, role = roles::ADMIN, "granted permissions");
    }

    let user = required_role(pool, roles::USER).await?;
    let user_added = if db::rbac::role_grant_count(pool, user.id).await? == 0 {
        let added = db::rbac::grant_permissions(pool, user.id, DEFAULT_USER_PERMISSIONS).await?;
        tracing::info!(count = added, role = roles::USER, "seeded default permissions");
        added
    } else {
        0
    };

    Ok((admin_added, user_added))
}

/// Create the configured admin account when no user holds its email.
pub async fn seed_admin(pool: &SqlitePool, seed: &AdminSeed) -> AppResult<bool> {
    if seed.uses_default_password() {
        tracing::warn!(email = %seed.email, "admin account uses the default password; set ADMIN_PASSWORD");
    }

    if db::users::email_exists(pool, &seed.email).await? {
        return Ok(false);
    }

    let salt = generate_salt();
    let password = seed.password.clone();
    let hash_salt = salt.clone();
    let password_hash = tokio::task::spawn_blocking(move || PasswordHasher::new().encrypt(&password, &hash_salt))
        .await
        .map_err(|err| AppError::internal(format!("password hashing task failed: {err}")))??;

    let new_user = NewUser {
        full_name: seed.full_name.clone(),
        email: seed.email.clone(),
        password_hash,
        password_salt: salt,
        phone_number: String::new(),
    };

    let admin = db::users::create_with_role(pool, new_user, roles::ADMIN).await?;
    tracing::info!(user_id = admin.id, email = %admin.email, "admin account created");

    Ok(true)
}

async fn required_role(pool: &SqlitePool, name: &str) -> AppResult<crate::models::rbac::Role> {
    db::rbac::find_role_by_name(pool, name)
        .await?
        .ok_or_else(|| AppError::configuration(format!("role {name} is missing")))
}
