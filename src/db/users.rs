use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::models::rbac::{RoleGrant, UserGrants};
use crate::models::user::DbUser;
use crate::utils::utc_now;

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, password_salt, phone_number, is_deleted, created_at, updated_at";

/// Fields of a user row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub phone_number: String,
}

/// Non-deleted user by email with every role and permission reachable
/// through its role joins, loaded in a single query.
pub async fn find_with_grants(pool: &SqlitePool, email: &str) -> AppResult<Option<UserGrants>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.full_name, u.email, u.password_hash, u.password_salt, u.phone_number,
               u.is_deleted, u.created_at, u.updated_at,
               r.id AS role_id, r.name AS role_name, p.name AS permission_name
        FROM users u
        LEFT JOIN user_roles ur ON ur.user_id = u.id
        LEFT JOIN roles r ON r.id = ur.role_id AND r.is_deleted = 0
        LEFT JOIN role_permissions rp ON rp.role_id = r.id
        LEFT JOIN permissions p ON p.id = rp.permission_id AND p.is_deleted = 0
        WHERE u.email = ? AND u.is_deleted = 0
        ORDER BY r.id, p.name
        "#,
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    fold_grants(&rows)
}

fn fold_grants(rows: &[SqliteRow]) -> AppResult<Option<UserGrants>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let user = DbUser::from_row(first)?;
    let mut roles: Vec<RoleGrant> = Vec::new();

    for row in rows {
        let Some(role_name) = row.try_get::<Option<String>, _>("role_name")? else {
            continue;
        };
        let permission: Option<String> = row.try_get("permission_name")?;

        let grant = match roles.iter().position(|role| role.name == role_name) {
            Some(index) => &mut roles[index],
            None => {
                roles.push(RoleGrant {
                    name: role_name,
                    permissions: Vec::new(),
                });
                let last = roles.len() - 1;
                &mut roles[last]
            }
        };

        if let Some(permission) = permission {
            grant.permissions.push(permission);
        }
    }

    Ok(Some(UserGrants { user, roles }))
}

pub async fn find_by_id(pool: &SqlitePool, user_id: i64) -> AppResult<Option<DbUser>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND is_deleted = 0");
    let user = sqlx::query_as::<_, DbUser>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Any user row, soft-deleted or not, already holds `email`.
pub async fn email_exists(pool: &SqlitePool, email: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Insert a user and link it to `role_name` atomically. A missing role is a
/// configuration error and nothing is written.
pub async fn create_with_role(pool: &SqlitePool, new_user: NewUser, role_name: &str) -> AppResult<DbUser> {
    let mut tx = pool.begin().await?;
    let now = utc_now();

    let user_id = sqlx::query(
        "INSERT INTO users (full_name, email, password_hash, password_salt, phone_number, is_deleted, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(&new_user.full_name)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.password_salt)
    .bind(&new_user.phone_number)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|err| {
        if super::is_unique_violation(&err) {
            AppError::conflict("User already exists.")
        } else {
            AppError::Database(err)
        }
    })?
    .last_insert_rowid();

    let role_id: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ? AND is_deleted = 0")
        .bind(role_name)
        .fetch_optional(&mut *tx)
        .await?;
    let role_id = role_id.ok_or_else(|| AppError::configuration(format!("role {role_name} is missing")))?;

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(DbUser {
        id: user_id,
        full_name: new_user.full_name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        password_salt: new_user.password_salt,
        phone_number: new_user.phone_number,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    })
}
