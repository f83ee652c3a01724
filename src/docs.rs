use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;

use crate::{authz, lifecycle, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::logout,
		routes::users::list_users,
		routes::users::update_role,
		routes::employees::list_employees,
		routes::employees::create_employee,
		routes::employees::get_employee,
		routes::employees::update_employee,
		routes::employees::delete_employee,
		routes::assets::list_assets,
		routes::assets::create_asset,
		routes::assets::get_asset,
		routes::assets::update_asset,
		routes::assets::assign_asset,
		routes::assets::delete_asset,
		routes::tickets::list_tickets,
		routes::tickets::create_ticket,
		routes::tickets::get_ticket,
		routes::tickets::update_ticket,
		routes::tickets::update_status,
		routes::tickets::list_transitions,
		routes::tickets::assign_ticket,
		routes::tickets::archive_ticket,
		routes::tickets::list_history,
		routes::tickets::list_comments,
		routes::tickets::add_comment,
		routes::portal::my_assets,
		routes::portal::my_tickets,
		routes::activity::list_activity
	),
	components(
		schemas(
			authz::Role,
			lifecycle::Level,
			lifecycle::TicketStatus,
			routes::health::HealthResponse,
			models::user::User,
			models::user::AuthResponse,
			models::user::MeResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::RoleUpdateRequest,
			models::employee::Employee,
			models::employee::EmployeeCreateRequest,
			models::employee::EmployeeUpdateRequest,
			models::asset::Asset,
			models::asset::AssetCreateRequest,
			models::asset::AssetUpdateRequest,
			models::asset::AssetAssignRequest,
			models::ticket::Ticket,
			models::ticket::TicketCreateRequest,
			models::ticket::TicketUpdateRequest,
			models::ticket::StatusUpdateRequest,
			models::ticket::TicketAssignRequest,
			models::ticket::TransitionsResponse,
			models::ticket::TicketHistoryEntry,
			models::ticket::TicketComment,
			models::ticket::CommentCreateRequest,
			models::activity::ActivityEntry
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Auth", description = "Authentication endpoints"),
		(name = "Users", description = "Admin console: users and roles"),
		(name = "Employees", description = "Employee directory"),
		(name = "Assets", description = "IT asset inventory"),
		(name = "Tickets", description = "Help-desk tickets"),
		(name = "Portal", description = "Employee self-service"),
		(name = "Activity", description = "Audit trail")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<Value> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	let root = doc
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))?;
	ensure_security_components(root)?;
	root.entry("security").or_insert_with(|| json!([{ "bearerAuth": [] }]));
	root.insert(
		"servers".to_string(),
		json!([{ "url": format!("http://localhost:{port}"), "description": "Local server" }]),
	);

	Ok(doc)
}

fn ensure_security_components(root: &mut Map<String, Value>) -> anyhow::Result<()> {
	let schemes = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("components must be an object"))?
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("securitySchemes must be an object"))?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	Ok(())
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn docs_routes(doc: Value) -> Router {
	let doc = Arc::new(doc);
	Router::new().route(
		"/api-docs/openapi.json",
		get(move || {
			let doc = Arc::clone(&doc);
			async move { Json(doc.as_ref().clone()) }
		}),
	)
}
