//! Outbound notifications. Delivery (SMTP and friends) lives behind `Notifier`.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    TicketCreated { ticket_id: i64, title: String, priority: String },
    TicketStatusChanged { ticket_id: i64, from: String, to: String, recipient_id: i64 },
    TicketAssigned { ticket_id: i64, assignee_id: i64 },
}

impl Notification {
    pub fn ticket_id(&self) -> i64 {
        match self {
            Notification::TicketCreated { ticket_id, .. }
            | Notification::TicketStatusChanged { ticket_id, .. }
            | Notification::TicketAssigned { ticket_id, .. } => *ticket_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of mailing them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let body = serde_json::to_string(notification).map_err(|err| NotifyError(err.to_string()))?;
        tracing::info!(ticket_id = notification.ticket_id(), notification = %body, "notification");
        Ok(())
    }
}

/// Delivers and swallows failures; a lost email never fails a ticket update.
pub async fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    if let Err(err) = notifier.notify(&notification).await {
        tracing::warn!(ticket_id = notification.ticket_id(), error = %err, "notification not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Notification>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError("smtp down".to_string()))
        }
    }

    #[tokio::test]
    async fn dispatch_delivers() {
        let notifier = Recording::default();
        dispatch(&notifier, Notification::TicketAssigned { ticket_id: 1, assignee_id: 2 }).await;
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        dispatch(&Failing, Notification::TicketAssigned { ticket_id: 1, assignee_id: 2 }).await;
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Notification::TicketCreated {
            ticket_id: 4,
            title: "VPN".to_string(),
            priority: "High".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "ticket_created");
    }
}
