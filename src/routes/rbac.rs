//! RBAC Admin API Routes
//!
//! Endpoints for managing roles, role grants and user role assignments.
//! Permissions themselves can only be listed: the catalog is fixed in code.
//! All RBAC modifications are logged to the activity log with Critical severity.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};

use crate::app::AppState;
use crate::authz::{roles, Permission, PolicyRegistry, Principal};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::api_result::ApiResult;
use crate::models::rbac::*;

// =============================================================================
// ROUTER
// =============================================================================

pub fn routes(policies: &PolicyRegistry) -> Router<AppState> {
    Router::new()
        // Roles
        .route(
            "/roles",
            get(list_roles)
                .route_layer(policies.require(Permission::RoleGetAll))
                .merge(post(create_role).route_layer(policies.require(Permission::RoleCreate))),
        )
        .route(
            "/roles/:role_id",
            get(get_role)
                .route_layer(policies.require(Permission::RoleGetById))
                .merge(delete(delete_role).route_layer(policies.require(Permission::RoleDelete))),
        )
        // Role grants
        .route(
            "/roles/:role_id/permissions",
            get(get_role_permissions)
                .route_layer(policies.require(Permission::RolePermissionGetAll))
                .merge(post(assign_permission_to_role).route_layer(policies.require(Permission::RolePermissionCreate))),
        )
        .route(
            "/roles/:role_id/permissions/:permission_id",
            delete(revoke_permission_from_role).route_layer(policies.require(Permission::RolePermissionDelete)),
        )
        // Permissions
        .route(
            "/permissions",
            get(list_permissions).route_layer(policies.require(Permission::PermissionGetAll)),
        )
        // User role assignments
        .route(
            "/users/:user_id/roles",
            get(get_user_roles)
                .route_layer(policies.require(Permission::UserRoleGetAll))
                .merge(post(assign_role_to_user).route_layer(policies.require(Permission::UserRoleCreate))),
        )
        .route(
            "/users/:user_id/roles/:role_id",
            delete(revoke_role_from_user).route_layer(policies.require(Permission::UserRoleDelete)),
        )
        // Effective permissions (computed)
        .route(
            "/users/:user_id/effective-permissions",
            get(get_effective_permissions).route_layer(policies.require(Permission::UserRoleGetById)),
        )
}

async fn require_role(state: &AppState, role_id: i64) -> AppResult<Role> {
    db::rbac::find_role(&state.pool, role_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("role {role_id} not found")))
}

async fn require_user(state: &AppState, user_id: i64) -> AppResult<()> {
    db::users::find_by_id(&state.pool, user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("user {user_id} not found")))
}

// =============================================================================
// ROLE ENDPOINTS
// =============================================================================

/// List all roles
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "RBAC",
    responses(
        (status = 200, description = "List of roles", body = Vec<Role>),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<ApiResult<Vec<Role>>>> {
    let roles = db::rbac::list_roles(&state.pool).await?;
    Ok(Json(ApiResult::success(roles)))
}

/// Create a new role
#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "RBAC",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Json(req): Json<RoleCreateRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<Role>>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("role name is required"));
    }

    let role = db::rbac::create_role(&state.pool, name).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(principal.user_id),
        &role,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(ApiResult::success(role))))
}

/// Get a role by ID
#[utoipa::path(
    get,
    path = "/api/roles/{role_id}",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role details", body = Role),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_role(State(state): State<AppState>, Path(role_id): Path<i64>) -> AppResult<Json<ApiResult<Role>>> {
    let role = require_role(&state, role_id).await?;
    Ok(Json(ApiResult::success(role)))
}

/// Soft delete a role. The built-in roles cannot be deleted.
#[utoipa::path(
    delete,
    path = "/api/roles/{role_id}",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role deleted", body = Role),
        (status = 400, description = "Built-in role"),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(role_id): Path<i64>,
) -> AppResult<Json<ApiResult<Role>>> {
    let role = require_role(&state, role_id).await?;
    if role.name == roles::ADMIN || role.name == roles::USER {
        return Err(AppError::bad_request(format!("role {} is built in", role.name)));
    }

    if !db::rbac::soft_delete_role(&state.pool, role_id).await? {
        return Err(AppError::not_found(format!("role {role_id} not found")));
    }

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(principal.user_id),
        &role,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(ApiResult::success(role)))
}

// =============================================================================
// PERMISSION ENDPOINTS
// =============================================================================

/// List the permission catalog as stored
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "List of permissions", body = Vec<PermissionRecord>),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_permissions(State(state): State<AppState>) -> AppResult<Json<ApiResult<Vec<PermissionRecord>>>> {
    let permissions = db::rbac::list_permissions(&state.pool).await?;
    Ok(Json(ApiResult::success(permissions)))
}

// =============================================================================
// ROLE-PERMISSION ENDPOINTS
// =============================================================================

/// Get permissions granted to a role
#[utoipa::path(
    get,
    path = "/api/roles/{role_id}/permissions",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Permissions of the role", body = Vec<PermissionRecord>),
        (status = 404, description = "Role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> AppResult<Json<ApiResult<Vec<PermissionRecord>>>> {
    require_role(&state, role_id).await?;
    let permissions = db::rbac::role_permissions(&state.pool, role_id).await?;
    Ok(Json(ApiResult::success(permissions)))
}

/// Grant a permission to a role
#[utoipa::path(
    post,
    path = "/api/roles/{role_id}/permissions",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    request_body = AssignPermissionToRoleRequest,
    responses(
        (status = 201, description = "Permission granted", body = RolePermission),
        (status = 404, description = "Role or permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_permission_to_role(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(role_id): Path<i64>,
    Json(req): Json<AssignPermissionToRoleRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<RolePermission>>)> {
    require_role(&state, role_id).await?;
    db::rbac::find_permission(&state.pool, req.permission_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("permission {} not found", req.permission_id)))?;

    let created = db::rbac::assign_permission(&state.pool, role_id, req.permission_id).await?;
    let grant = RolePermission {
        role_id,
        permission_id: req.permission_id,
    };

    if created {
        log_activity_with_context(
            &state.event_bus,
            "assigned",
            Some(principal.user_id),
            &grant,
            None,
            Some(RequestContext::from_headers(&headers)),
        );
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ApiResult::success(grant))))
}

/// Revoke a permission from a role
#[utoipa::path(
    delete,
    path = "/api/roles/{role_id}/permissions/{permission_id}",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
        ("permission_id" = i64, Path, description = "Permission ID"),
    ),
    responses(
        (status = 200, description = "Permission revoked", body = RolePermission),
        (status = 404, description = "Grant not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_permission_from_role(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResult<RolePermission>>> {
    if !db::rbac::revoke_permission(&state.pool, role_id, permission_id).await? {
        return Err(AppError::not_found("grant not found"));
    }

    let grant = RolePermission { role_id, permission_id };

    log_activity_with_context(
        &state.event_bus,
        "revoked",
        Some(principal.user_id),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(ApiResult::success(grant)))
}

// =============================================================================
// USER-ROLE ENDPOINTS
// =============================================================================

/// Get roles assigned to a user
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/roles",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "List of assigned roles", body = Vec<Role>),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResult<Vec<Role>>>> {
    require_user(&state, user_id).await?;
    let roles = db::rbac::user_roles(&state.pool, user_id).await?;
    Ok(Json(ApiResult::success(roles)))
}

/// Assign a role to a user
#[utoipa::path(
    post,
    path = "/api/users/{user_id}/roles",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
    ),
    request_body = AssignRoleRequest,
    responses(
        (status = 201, description = "Role assigned", body = UserRole),
        (status = 404, description = "User or role not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_role_to_user(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    Json(req): Json<AssignRoleRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<UserRole>>)> {
    require_user(&state, user_id).await?;
    require_role(&state, req.role_id).await?;

    let created = db::rbac::assign_role(&state.pool, user_id, req.role_id).await?;
    let assignment = UserRole {
        user_id,
        role_id: req.role_id,
    };

    if created {
        log_activity_with_context(
            &state.event_bus,
            "assigned",
            Some(principal.user_id),
            &assignment,
            None,
            Some(RequestContext::from_headers(&headers)),
        );
    }

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ApiResult::success(assignment))))
}

/// Revoke a role from a user
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}/roles/{role_id}",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role revoked", body = UserRole),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_role_from_user(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path((user_id, role_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResult<UserRole>>> {
    if !db::rbac::revoke_role(&state.pool, user_id, role_id).await? {
        return Err(AppError::not_found("assignment not found"));
    }

    let assignment = UserRole { user_id, role_id };

    log_activity_with_context(
        &state.event_bus,
        "revoked",
        Some(principal.user_id),
        &assignment,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(ApiResult::success(assignment)))
}

// =============================================================================
// EFFECTIVE PERMISSIONS
// =============================================================================

/// Get computed effective permissions for a user
///
/// Reflects storage now. A session token issued earlier keeps the grants it
/// was minted with until it expires.
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/effective-permissions",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Effective permissions", body = EffectivePermissions),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_effective_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResult<EffectivePermissions>>> {
    require_user(&state, user_id).await?;

    let roles = db::rbac::user_roles(&state.pool, user_id)
        .await?
        .into_iter()
        .map(|role| role.name)
        .collect();
    let permissions = db::rbac::effective_permissions(&state.pool, user_id)
        .await?
        .into_iter()
        .collect();

    Ok(Json(ApiResult::success(EffectivePermissions {
        user_id,
        roles,
        permissions,
    })))
}
