use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<T> {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub payload: T,
}

impl<T> DomainEvent<T> {
    pub fn new(name: impl Into<String>, actor_id: Option<i64>, subject_id: Option<i64>, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            actor_id,
            subject_id,
            payload,
        }
    }
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

/// Request context for activity logging (IP, User-Agent)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    #[serde(rename = "new")]
    pub current: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    pub severity: Severity,
}

pub fn log_activity<T: Loggable>(event_bus: &EventBus, action: &str, actor_id: Option<i64>, entity: &T) {
    log_activity_with_context(event_bus, action, actor_id, entity, None, None);
}

/// Publishes `<entity_type>.<action>` with old/new state and request context.
pub fn log_activity_with_context<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<i64>,
    entity: &T,
    old_entity: Option<&T>,
    context: Option<RequestContext>,
) {
    let event_name = format!("{}.{}", T::entity_type(), action);

    let payload = ActivityPayload {
        current: serde_json::to_value(entity).unwrap_or_default(),
        old: old_entity.map(|e| serde_json::to_value(e).unwrap_or_default()),
        context,
        severity: entity.severity_for_action(action),
    };

    let event = DomainEvent::new(
        event_name,
        actor_id,
        Some(entity.subject_id()),
        serde_json::to_value(&payload).unwrap_or_default(),
    );

    // No subscribers only means nobody is projecting; the request still succeeds.
    if event_bus.send(serde_json::to_value(event).unwrap_or_default()).is_err() {
        tracing::debug!(event = T::entity_type(), "activity event dropped, no listener");
    }
}

fn describe(name: &str) -> &'static str {
    match name {
        "ticket.created" => "Ticket created",
        "ticket.updated" => "Ticket updated",
        "ticket.assigned" => "Ticket assigned",
        "ticket.archived" => "Ticket archived",
        "ticket_status.updated" => "Ticket status changed",
        "ticket_comment.created" => "Comment added",
        "asset.created" => "Asset created",
        "asset.updated" => "Asset updated",
        "asset.assigned" => "Asset assigned",
        "asset.deleted" => "Asset deleted",
        "employee.created" => "Employee created",
        "employee.updated" => "Employee updated",
        "employee.deleted" => "Employee deleted",
        "user.registered" => "New user registered",
        "user.login" => "User logged in",
        "user_role.updated" => "User role changed",
        _ => "System event",
    }
}

/// Projects bus events into `activity_log` and the hash-chained `event_store`.
pub async fn start_activity_listener(mut rx: broadcast::Receiver<Value>, pool: SqlitePool) {
    tracing::info!("activity listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "activity listener lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(err) = persist_event(&pool, &event).await {
            tracing::error!(error = %err, "failed to persist activity event");
        }
    }
    tracing::info!("activity listener stopped");
}

pub async fn persist_event(pool: &SqlitePool, event: &Value) -> Result<(), sqlx::Error> {
    let name = event.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
    let actor_id = event.get("actor_id").and_then(|v| v.as_i64());
    let subject_id = event.get("subject_id").and_then(|v| v.as_i64());
    let occurred_at = event
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let severity = event
        .get("payload")
        .and_then(|p| p.get("severity"))
        .and_then(|s| s.as_str())
        .unwrap_or(Severity::Important.as_str());
    let payload = serde_json::to_string(event).unwrap_or_default();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO activity_log (id, event_name, description, actor_id, subject_id, occurred_at, properties, severity) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(describe(name))
    .bind(actor_id)
    .bind(subject_id)
    .bind(occurred_at)
    .bind(&payload)
    .bind(severity)
    .execute(&mut *tx)
    .await?;

    let previous: Option<(i64, String)> =
        sqlx::query_as("SELECT seq, hash FROM event_store ORDER BY seq DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;

    let (seq, prev_hash) = match previous {
        Some((seq, hash)) => (seq + 1, Some(hash)),
        None => (1, None),
    };
    let hash = chain_hash(prev_hash.as_deref(), &payload);

    sqlx::query(
        "INSERT INTO event_store (id, seq, event_name, occurred_at, actor_id, subject_id, payload, severity, prev_hash, hash) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(seq)
    .bind(name)
    .bind(occurred_at)
    .bind(actor_id)
    .bind(subject_id)
    .bind(&payload)
    .bind(severity)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// SHA-256 over the previous hash (if any) followed by the payload.
pub fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}
