//! In-memory backend used by `storage.backend = memory` and the test suite

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::{AuditTrailStore, NotificationStore, RecordQuery, RecordStore};
use crate::{
    models::{AuditEntry, LifecycleFilter, Notification, StoredRecord},
    validation::coerce_date,
    Error, Result,
};

#[derive(Default)]
struct Tables {
    /// Insertion order
    records: Vec<StoredRecord>,
    notifications: Vec<Notification>,
    audit: Vec<AuditEntry>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(query: &RecordQuery, record: &StoredRecord) -> bool {
    if record.collection != query.collection || !query.lifecycle.matches(&record.lifecycle) {
        return false;
    }
    if let Some(owner) = &query.owner {
        if !record.is_owned_by(owner) {
            return false;
        }
    }
    if let Some(codes) = &query.codes {
        if !codes.iter().any(|c| c == &record.code) {
            return false;
        }
    }
    if let Some(text) = &query.text {
        let needle = text.needle.to_lowercase();
        let hit = text.fields.iter().any(|field| {
            record
                .payload_str(field)
                .is_some_and(|value| value.to_lowercase().contains(&needle))
        });
        if !hit {
            return false;
        }
    }
    if let Some(range) = &query.date_range {
        let Some(date) = record.payload_str(&range.field).and_then(coerce_date) else {
            return false;
        };
        if date < range.start || date > range.end {
            return false;
        }
    }
    true
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first(mut records: Vec<StoredRecord>) -> Vec<StoredRecord> {
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert(&self, record: &StoredRecord) -> Result<()> {
        let mut tables = self.inner.write().await;
        let duplicate = tables
            .records
            .iter()
            .any(|r| r.collection == record.collection && r.code == record.code);
        if duplicate {
            return Err(Error::Conflict(format!("Record {} already exists", record.code)));
        }
        tables.records.push(record.clone());
        Ok(())
    }

    async fn find_by_code(
        &self,
        collection: &str,
        code: &str,
        lifecycle: LifecycleFilter,
    ) -> Result<Option<StoredRecord>> {
        let tables = self.inner.read().await;
        Ok(tables
            .records
            .iter()
            .find(|r| {
                r.collection == collection && r.code == code && lifecycle.matches(&r.lifecycle)
            })
            .cloned())
    }

    async fn find(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>> {
        let tables = self.inner.read().await;
        let hits = tables
            .records
            .iter()
            .filter(|r| matches(query, r))
            .cloned()
            .collect();
        Ok(newest_first(hits))
    }

    async fn count(&self, query: &RecordQuery) -> Result<i64> {
        let tables = self.inner.read().await;
        Ok(tables.records.iter().filter(|r| matches(query, r)).count() as i64)
    }

    async fn replace(&self, record: &StoredRecord) -> Result<()> {
        let mut tables = self.inner.write().await;
        let Some(slot) = tables.records.iter_mut().find(|r| r.id == record.id) else {
            return Err(Error::NotFound(format!("Record {} not found", record.code)));
        };
        *slot = record.clone();
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.inner
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let tables = self.inner.read().await;
        let mut out: Vec<Notification> = tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        recipient_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        let mut tables = self.inner.write().await;
        let Some(n) = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
        else {
            return Ok(None);
        };
        n.is_read = true;
        n.read_at.get_or_insert(now);
        Ok(Some(n.clone()))
    }

    async fn purge_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.inner.write().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|n| n.created_at >= cutoff);
        Ok((before - tables.notifications.len()) as u64)
    }
}

#[async_trait]
impl AuditTrailStore for InMemoryStore {
    async fn insert_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.inner.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn list_for_record(&self, collection: &str, code: &str) -> Result<Vec<AuditEntry>> {
        let tables = self.inner.read().await;
        Ok(tables
            .audit
            .iter()
            .filter(|e| e.collection == collection && e.record_code == code)
            .cloned()
            .collect())
    }

    async fn purge_audit_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.inner.write().await;
        let before = tables.audit.len();
        tables.audit.retain(|e| e.recorded_at >= cutoff);
        Ok((before - tables.audit.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AuditAction, NotificationInput, NotificationKind, Priority, UserRef,
    };
    use chrono::{Duration, NaiveDate};
    use serde_json::json;

    fn owner(id: &str) -> UserRef {
        UserRef {
            id: id.to_string(),
            name: None,
            role: None,
        }
    }

    fn slip(code: &str, by: &str, patient: &str, date: &str) -> StoredRecord {
        StoredRecord::new(
            "referral_slips",
            code.to_string(),
            json!({ "referralSlip": { "patientName": patient, "date": date } }),
            owner(by),
            Utc::now(),
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn duplicate_codes_conflict() {
        let store = InMemoryStore::new();
        store
            .insert(&slip("RS-20240101-AAAAAA", "u1", "Ana", "2024-01-01"))
            .await
            .unwrap();
        let err = store
            .insert(&slip("RS-20240101-AAAAAA", "u2", "Ben", "2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn text_and_date_filters() {
        let store = InMemoryStore::new();
        for (code, patient, date) in [
            ("RS-20240101-000001", "Juan Dela Cruz", "2024-01-01"),
            ("RS-20240101-000002", "Maria Juana", "2024-01-15"),
            ("RS-20240101-000003", "Pedro Penduko", "2024-01-31"),
            ("RS-20240101-000004", "Jose", "2024-02-01"),
        ] {
            store.insert(&slip(code, "u1", patient, date)).await.unwrap();
        }

        let by_name = RecordQuery::active("referral_slips")
            .matching(&["/referralSlip/patientName"], "JUAN");
        assert_eq!(store.count(&by_name).await.unwrap(), 2);

        let in_january = RecordQuery::active("referral_slips").dated_between(
            "/referralSlip/date",
            day(1),
            day(31),
        );
        let codes: Vec<String> = store
            .find(&in_january)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(
            codes,
            vec![
                "RS-20240101-000003",
                "RS-20240101-000002",
                "RS-20240101-000001"
            ]
        );
    }

    #[tokio::test]
    async fn lifecycle_and_owner_scoping() {
        let store = InMemoryStore::new();
        let mut mine = slip("RS-20240101-000001", "u1", "Ana", "2024-01-01");
        store.insert(&mine).await.unwrap();
        store
            .insert(&slip("RS-20240101-000002", "u2", "Ben", "2024-01-01"))
            .await
            .unwrap();

        mine.soft_delete(owner("u1"), Utc::now());
        store.replace(&mine).await.unwrap();

        let active = RecordQuery::active("referral_slips");
        assert_eq!(store.count(&active).await.unwrap(), 1);
        let deleted_mine = RecordQuery::deleted("referral_slips").owned_by(Some("u1"));
        assert_eq!(store.count(&deleted_mine).await.unwrap(), 1);
        assert!(store
            .find_by_code("referral_slips", &mine.code, LifecycleFilter::Active)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn purges_only_rows_older_than_cutoff() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for age_days in [40, 31, 1] {
            let created = now - Duration::days(age_days);
            let n = Notification::from_input(
                NotificationInput {
                    recipient_id: "u1".to_string(),
                    title: "t".to_string(),
                    message: "m".to_string(),
                    kind: NotificationKind::RecordCreated,
                    priority: Priority::Low,
                    is_action_required: false,
                    metadata: json!({}),
                },
                created,
            );
            store.insert_notification(&n).await.unwrap();
            store
                .insert_audit(&AuditEntry::new(
                    owner("u1"),
                    AuditAction::Create,
                    "referral_slips",
                    "RS-20240101-000001",
                    created,
                ))
                .await
                .unwrap();
        }

        let cutoff = now - Duration::days(30);
        assert_eq!(store.purge_notifications_before(cutoff).await.unwrap(), 2);
        assert_eq!(store.purge_audit_before(cutoff).await.unwrap(), 2);
        assert_eq!(store.list_for_recipient("u1", false).await.unwrap().len(), 1);
    }
}
