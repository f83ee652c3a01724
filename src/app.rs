use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{self, PermissionMap};
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::notifications::{LogNotifier, Notifier};
use crate::routes::{activity, assets, auth, employees, health, portal, tickets, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<PermissionMap>,
    pub event_bus: EventBus,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy: authz::policy(),
            event_bus,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, event_bus);
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/:id/role", put(users::update_role));

    let employee_routes = Router::new()
        .route("/", get(employees::list_employees).post(employees::create_employee))
        .route(
            "/:id",
            get(employees::get_employee)
                .put(employees::update_employee)
                .delete(employees::delete_employee),
        );

    let asset_routes = Router::new()
        .route("/", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/:id",
            get(assets::get_asset).put(assets::update_asset).delete(assets::delete_asset),
        )
        .route("/:id/assign", put(assets::assign_asset));

    let ticket_routes = Router::new()
        .route("/", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::archive_ticket),
        )
        .route("/:id/status", put(tickets::update_status))
        .route("/:id/transitions", get(tickets::list_transitions))
        .route("/:id/assign", put(tickets::assign_ticket))
        .route("/:id/history", get(tickets::list_history))
        .route("/:id/comments", get(tickets::list_comments).post(tickets::add_comment));

    let portal_routes = Router::new()
        .route("/assets", get(portal::my_assets))
        .route("/tickets", get(portal::my_tickets));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/activity", get(activity::list_activity))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/employees", employee_routes)
        .nest("/assets", asset_routes)
        .nest("/tickets", ticket_routes)
        .nest("/portal", portal_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
