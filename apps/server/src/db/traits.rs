//! Storage traits for records, notifications and the audit trail
//!
//! Any backend (PostgreSQL, in-memory, ...) implementing these traits can sit
//! behind the record services. Records are never physically deleted through
//! [`RecordStore`]; soft deletion is a [`replace`](RecordStore::replace) with a
//! `Deleted` lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    models::{AuditEntry, LifecycleFilter, Notification, StoredRecord},
    Result,
};

/// Case-insensitive substring match over one or more JSON-pointer fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub fields: Vec<String>,
    pub needle: String,
}

/// Inclusive on both ends, over an ISO date stored at a JSON pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub field: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub collection: String,
    pub lifecycle: LifecycleFilter,
    pub owner: Option<String>,
    pub codes: Option<Vec<String>>,
    pub text: Option<TextMatch>,
    pub date_range: Option<DateRange>,
}

impl RecordQuery {
    pub fn active(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            lifecycle: LifecycleFilter::Active,
            owner: None,
            codes: None,
            text: None,
            date_range: None,
        }
    }

    pub fn deleted(collection: &str) -> Self {
        Self {
            lifecycle: LifecycleFilter::Deleted,
            ..Self::active(collection)
        }
    }

    pub fn owned_by(mut self, owner: Option<&str>) -> Self {
        self.owner = owner.map(str::to_string);
        self
    }

    pub fn with_codes(mut self, codes: Vec<String>) -> Self {
        self.codes = Some(codes);
        self
    }

    pub fn matching(mut self, fields: &[&str], needle: &str) -> Self {
        self.text = Some(TextMatch {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            needle: needle.to_string(),
        });
        self
    }

    pub fn dated_between(mut self, field: &str, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange {
            field: field.to_string(),
            start,
            end,
        });
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record.
    ///
    /// # Errors
    /// * `Conflict` - a record with the same `(collection, code)` exists
    async fn insert(&self, record: &StoredRecord) -> Result<()>;

    /// Look up a record by formatted id within a lifecycle state.
    async fn find_by_code(
        &self,
        collection: &str,
        code: &str,
        lifecycle: LifecycleFilter,
    ) -> Result<Option<StoredRecord>>;

    /// Records matching the query, newest first.
    async fn find(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>>;

    async fn count(&self, query: &RecordQuery) -> Result<i64>;

    /// Overwrite payload, audit fields and lifecycle of an existing record.
    ///
    /// # Errors
    /// * `NotFound` - no record with this surrogate id
    async fn replace(&self, record: &StoredRecord) -> Result<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Newest first.
    async fn list_for_recipient(
        &self,
        recipient_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>>;

    /// Marks a recipient's notification read. `None` if it does not belong to them.
    async fn mark_read(
        &self,
        id: Uuid,
        recipient_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>>;

    /// Delete notifications created before `cutoff`. Returns rows removed.
    async fn purge_notifications_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait AuditTrailStore: Send + Sync {
    async fn insert_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Oldest first.
    async fn list_for_record(&self, collection: &str, code: &str) -> Result<Vec<AuditEntry>>;

    /// Delete audit rows recorded before `cutoff`. Returns rows removed.
    async fn purge_audit_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
