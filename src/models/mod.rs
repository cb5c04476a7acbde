pub mod api_result;
pub mod product;
pub mod rbac;
pub mod user;
