#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use simpleit::authz::Role;
use simpleit::create_app;
use simpleit::routes::auth::insert_user;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp { app, pool, _dir: dir })
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// Self-registration; always yields an employee.
    pub async fn register(&self, name: &str, email: &str) -> Result<(String, i64)> {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await?;
        if status != StatusCode::CREATED {
            panic!("register failed: {} - {}", status, body);
        }
        token_and_id(&body)
    }

    /// Inserts a user with `role` directly and logs in through the API.
    pub async fn user_with_role(&self, name: &str, email: &str, role: Role) -> Result<(String, i64)> {
        insert_user(&self.pool, name, email, PASSWORD, role).await?;
        self.login(email).await
    }

    pub async fn login(&self, email: &str) -> Result<(String, i64)> {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await?;
        if status != StatusCode::OK {
            panic!("login failed: {} - {}", status, body);
        }
        token_and_id(&body)
    }

    pub async fn create_ticket(&self, token: &str, body: Value) -> Result<Value> {
        let (status, ticket) = self.post("/tickets", token, body).await?;
        if status != StatusCode::CREATED {
            panic!("ticket create failed: {} - {}", status, ticket);
        }
        Ok(ticket)
    }
}

fn token_and_id(body: &Value) -> Result<(String, i64)> {
    let token = body.get("token").and_then(|v| v.as_str()).context("missing token")?.to_string();
    let id = body
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(|v| v.as_i64())
        .context("missing user id")?;
    Ok((token, id))
}

pub fn id_of(value: &Value) -> i64 {
    value.get("id").and_then(|v| v.as_i64()).expect("response has an id")
}
