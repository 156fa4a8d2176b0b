//! Notification fan-out for record mutations.
//!
//! Emission is best-effort: a failed insert is logged and counted but never
//! fails the request that triggered it.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::Principal,
    db::NotificationStore,
    metrics::NOTIFICATIONS_TOTAL,
    models::{Notification, NotificationInput},
    Error, Result,
};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn emit(&self, input: NotificationInput) {
        let kind = input.kind;
        let notification = Notification::from_input(input, Utc::now());
        match self.store.insert_notification(&notification).await {
            Ok(()) => {
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "ok"])
                    .inc();
                tracing::debug!(
                    notification_id = %notification.id,
                    recipient = %notification.recipient_id,
                    kind = %kind,
                    "Notification emitted"
                );
            }
            Err(e) => {
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                tracing::warn!(
                    recipient = %notification.recipient_id,
                    kind = %kind,
                    "Failed to emit notification: {}",
                    e
                );
            }
        }
    }

    pub async fn list(&self, principal: &Principal, unread_only: bool) -> Result<Vec<Notification>> {
        self.store
            .list_for_recipient(&principal.user_id, unread_only)
            .await
    }

    /// Only the recipient may mark a notification read.
    pub async fn mark_read(&self, principal: &Principal, id: &str) -> Result<Notification> {
        let id = Uuid::parse_str(id)
            .map_err(|_| Error::invalid("id", "must be a valid notification id"))?;
        self.store
            .mark_read(id, &principal.user_id, Utc::now())
            .await?
            .ok_or_else(|| Error::NotFound("Notification not found".to_string()))
    }
}
