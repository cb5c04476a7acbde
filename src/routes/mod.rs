pub mod auth;
pub mod health;
pub mod products;
pub mod rbac;
pub mod users;

use axum::http::StatusCode;
use axum::Json;

use crate::models::api_result::ApiResult;

/// 200 for a successful envelope, 400 for an expected failure.
pub(crate) fn envelope<T>(result: ApiResult<T>) -> (StatusCode, Json<ApiResult<T>>) {
    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(result))
}
