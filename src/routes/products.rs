use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::{Permission, PolicyRegistry, Principal};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::models::api_result::ApiResult;
use crate::models::product::{Product, ProductRequest};

pub fn routes(policies: &PolicyRegistry) -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(list_products)
                .route_layer(policies.require(Permission::ProductGetAll))
                .merge(post(create_product).route_layer(policies.require(Permission::ProductCreate))),
        )
        .route(
            "/products/:id",
            get(get_product)
                .route_layer(policies.require(Permission::ProductGetById))
                .merge(put(update_product).route_layer(policies.require(Permission::ProductUpdate)))
                .merge(delete(delete_product).route_layer(policies.require(Permission::ProductDelete))),
        )
}

fn validate(req: &ProductRequest) -> AppResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("product name is required"));
    }
    if !req.price.is_finite() || req.price < 0.0 {
        return Err(AppError::bad_request("price must be a non-negative number"));
    }
    if req.stock < 0 {
        return Err(AppError::bad_request("stock must not be negative"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "List products", body = Vec<Product>),
        (status = 403, description = "Missing Product_GetAll")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<ApiResult<Vec<Product>>>> {
    let products = db::products::list(&state.pool).await?;
    Ok(Json(ApiResult::success(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product detail", body = Product),
        (status = 404, description = "Product not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<ApiResult<Product>>> {
    let product = db::products::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("product not found"))?;
    Ok(Json(ApiResult::success(product)))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 403, description = "Missing Product_Create")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Json(req): Json<ProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<Product>>)> {
    validate(&req)?;
    let product = db::products::create(&state.pool, &req).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(principal.user_id),
        &product,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(ApiResult::success(product))))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 404, description = "Product not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ProductRequest>,
) -> AppResult<Json<ApiResult<Product>>> {
    validate(&req)?;
    let old = db::products::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("product not found"))?;
    let product = db::products::update(&state.pool, id, &req)
        .await?
        .ok_or_else(|| AppError::not_found("product not found"))?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(principal.user_id),
        &product,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(ApiResult::success(product)))
}

/// Soft delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product soft deleted", body = Product),
        (status = 403, description = "Missing Product_Delete"),
        (status = 404, description = "Product not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResult<Product>>> {
    let product = db::products::soft_delete(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("product not found"))?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(principal.user_id),
        &product,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(ApiResult::success(product)))
}
