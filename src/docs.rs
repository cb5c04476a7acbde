use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::auth::register,
		routes::auth::login,
		routes::health::health,
		routes::users::profile,
		routes::products::list_products,
		routes::products::get_product,
		routes::products::create_product,
		routes::products::update_product,
		routes::products::delete_product,
		routes::rbac::list_roles,
		routes::rbac::create_role,
		routes::rbac::get_role,
		routes::rbac::delete_role,
		routes::rbac::list_permissions,
		routes::rbac::get_role_permissions,
		routes::rbac::assign_permission_to_role,
		routes::rbac::revoke_permission_from_role,
		routes::rbac::get_user_roles,
		routes::rbac::assign_role_to_user,
		routes::rbac::revoke_role_from_user,
		routes::rbac::get_effective_permissions
	),
	components(
		schemas(
			models::user::User,
			models::user::Profile,
			models::user::LoginRequest,
			models::user::LoginResponse,
			models::user::RegisterRequest,
			models::user::RegisterResponse,
			models::product::Product,
			models::product::ProductRequest,
			models::rbac::Role,
			models::rbac::RoleCreateRequest,
			models::rbac::PermissionRecord,
			models::rbac::UserRole,
			models::rbac::AssignRoleRequest,
			models::rbac::RolePermission,
			models::rbac::AssignPermissionToRoleRequest,
			models::rbac::EffectivePermissions,
			routes::health::HealthResponse
		)
	),
	tags(
		(name = "Auth", description = "Registration and login"),
		(name = "Health", description = "Liveness"),
		(name = "Users", description = "Caller profile"),
		(name = "Products", description = "Product catalog"),
		(name = "RBAC", description = "Roles, grants and assignments")
	)
)]
pub struct ApiDoc;

/// The generated document plus the bearer scheme and a local server entry.
///
/// Every response body is wrapped in the `{data, succeeded, errors}` envelope;
/// the schemas above describe the `data` member.
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes<S>(doc: utoipa::openapi::OpenApi) -> Router<S>
where
	S: Clone + Send + Sync + 'static,
{
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let json_route = get(move || {
		let doc = doc.clone();
		async move { Json(doc) }
	});

	Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_security_components(doc: &mut Value) {
	let Some(root) = doc.as_object_mut() else {
		return;
	};

	let components = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()));
	let Some(components) = components.as_object_mut() else {
		return;
	};

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()));
	if let Some(schemes) = schemes.as_object_mut() {
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	let server_url = format!("http://localhost:{}", port);

	match doc.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			doc["servers"] = json!([{ "url": server_url }]);
		}
	}
}
