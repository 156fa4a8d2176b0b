//! Daily retention purge of notifications and audit-trail rows

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::{runner::ScheduledJob, schedule::Schedule};
use crate::{
    db::{AuditTrailStore, NotificationStore},
    metrics::PURGED_ROWS_TOTAL,
    Error, Result,
};

pub struct CleanupJob {
    notifications: Arc<dyn NotificationStore>,
    audit: Arc<dyn AuditTrailStore>,
    retention: Duration,
    schedule: Schedule,
}

impl CleanupJob {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        audit: Arc<dyn AuditTrailStore>,
        retention_days: u32,
        schedule: Schedule,
    ) -> Self {
        Self {
            notifications,
            audit,
            retention: Duration::days(i64::from(retention_days)),
            schedule,
        }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }
}

#[async_trait]
impl ScheduledJob for CleanupJob {
    fn name(&self) -> &str {
        "retention_cleanup"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Both purges are attempted even if the first fails.
    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let cutoff = self.cutoff(now);
        let mut failures = Vec::new();

        match self.notifications.purge_notifications_before(cutoff).await {
            Ok(count) => {
                PURGED_ROWS_TOTAL
                    .with_label_values(&["notifications"])
                    .inc_by(count);
                tracing::info!(%cutoff, deleted = count, "Purged old notifications");
            }
            Err(e) => failures.push(format!("notifications: {e}")),
        }

        match self.audit.purge_audit_before(cutoff).await {
            Ok(count) => {
                PURGED_ROWS_TOTAL
                    .with_label_values(&["audit_trail"])
                    .inc_by(count);
                tracing::info!(%cutoff, deleted = count, "Purged old audit trail entries");
            }
            Err(e) => failures.push(format!("audit_trail: {e}")),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "Retention cleanup failed ({})",
                failures.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{
        AuditAction, AuditEntry, Notification, NotificationInput, NotificationKind, Priority,
        UserRef,
    };
    use serde_json::json;

    fn notification(at: DateTime<Utc>) -> Notification {
        Notification::from_input(
            NotificationInput {
                recipient_id: "nurse-1".to_string(),
                title: "Referral slip created".to_string(),
                message: "Referral slip created".to_string(),
                kind: NotificationKind::RecordCreated,
                priority: Priority::Medium,
                is_action_required: false,
                metadata: json!({}),
            },
            at,
        )
    }

    #[tokio::test]
    async fn purges_rows_past_retention() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let actor = UserRef {
            id: "nurse-1".to_string(),
            name: None,
            role: None,
        };
        for days in [45, 30, 29, 0] {
            let at = now - Duration::days(days) + Duration::seconds(1);
            store.insert_notification(&notification(at)).await.unwrap();
            store
                .insert_audit(&AuditEntry::new(
                    actor.clone(),
                    AuditAction::Update,
                    "prescriptions",
                    "RX-20240101-AAAAAA",
                    at,
                ))
                .await
                .unwrap();
        }

        let job = CleanupJob::new(
            store.clone(),
            store.clone(),
            30,
            Schedule::Daily { hour: 2, minute: 0 },
        );
        job.run(now).await.unwrap();

        // Only the 45-day-old rows fall before the cutoff.
        assert_eq!(
            store.list_for_recipient("nurse-1", false).await.unwrap().len(),
            3
        );
        assert_eq!(
            store
                .list_for_record("prescriptions", "RX-20240101-AAAAAA")
                .await
                .unwrap()
                .len(),
            3
        );
    }
}
