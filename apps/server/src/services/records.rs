//! Record lifecycle service, shared by every record kind.
//!
//! Control flow for mutations: role gate -> validation -> load -> ownership
//! check -> persistence -> notification + audit row. Authorization failures
//! short-circuit before any write.

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde_json::{json, Map, Value as JsonValue};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    auth::Principal,
    db::{RecordQuery, RecordStore},
    ids,
    metrics::RECORD_MUTATIONS_TOTAL,
    models::{
        sanitize_patch, AuditAction, LifecycleFilter, NotificationInput, NotificationKind,
        Priority, RecordKind, StoredRecord,
    },
    services::{AuditService, NotificationService},
    validation::{coerce_date, parse},
    Error, Result,
};

/// Attempts at drawing a fresh formatted id before giving up on collisions.
const ID_ATTEMPTS: usize = 3;

pub struct RecordService<K: RecordKind> {
    store: Arc<dyn RecordStore>,
    notifications: NotificationService,
    audit: AuditService,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RecordKind> Clone for RecordService<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifications: self.notifications.clone(),
            audit: self.audit.clone(),
            _kind: PhantomData,
        }
    }
}

/// Outcome of a bulk soft delete.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Mutation {
    action: AuditAction,
    kind: NotificationKind,
    priority: Priority,
    verb: &'static str,
}

const CREATED: Mutation = Mutation {
    action: AuditAction::Create,
    kind: NotificationKind::RecordCreated,
    priority: Priority::Medium,
    verb: "created",
};
const UPDATED: Mutation = Mutation {
    action: AuditAction::Update,
    kind: NotificationKind::RecordUpdated,
    priority: Priority::Low,
    verb: "updated",
};
const DELETED: Mutation = Mutation {
    action: AuditAction::Delete,
    kind: NotificationKind::RecordDeleted,
    priority: Priority::High,
    verb: "deleted",
};
const RESTORED: Mutation = Mutation {
    action: AuditAction::Restore,
    kind: NotificationKind::RecordRestored,
    priority: Priority::Medium,
    verb: "restored",
};
pub(crate) const GENERATED: Mutation = Mutation {
    action: AuditAction::Generate,
    kind: NotificationKind::ReportGenerated,
    priority: Priority::Medium,
    verb: "generated",
};

pub(crate) fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<K: RecordKind> RecordService<K> {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifications: NotificationService,
        audit: AuditService,
    ) -> Self {
        Self {
            store,
            notifications,
            audit,
            _kind: PhantomData,
        }
    }

    /// Response shape for one record, including derived fields.
    pub fn view(&self, record: &StoredRecord) -> JsonValue {
        let mut view = record.to_json(K::ID_FIELD);
        if let (JsonValue::Object(map), Some(payload)) = (&mut view, self.payload_of(record)) {
            K::decorate(&payload, map);
        }
        view
    }

    pub fn views(&self, records: &[StoredRecord]) -> Vec<JsonValue> {
        records.iter().map(|r| self.view(r)).collect()
    }

    /// Typed payload of a stored record; `None` if it no longer fits the schema.
    pub fn payload_of(&self, record: &StoredRecord) -> Option<K::Payload> {
        match serde_json::from_value(record.payload.clone()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(
                    collection = K::COLLECTION,
                    code = %record.code,
                    "Stored payload does not match schema: {}",
                    e
                );
                None
            }
        }
    }

    fn not_found(&self) -> Error {
        Error::NotFound(format!("{} not found", capitalize(K::LABEL)))
    }

    fn ensure_owner(&self, principal: &Principal, record: &StoredRecord, action: &str) -> Result<()> {
        if record.is_owned_by(&principal.user_id) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "You can only {} {}s you created",
                action,
                K::LABEL
            )))
        }
    }

    async fn load(&self, code: &str, lifecycle: LifecycleFilter) -> Result<StoredRecord> {
        ids::ensure_valid(K::ID_PREFIX, K::ID_FIELD, code)?;
        self.store
            .find_by_code(K::COLLECTION, code, lifecycle)
            .await?
            .ok_or_else(|| self.not_found())
    }

    async fn after_mutation(
        &self,
        principal: &Principal,
        record: &StoredRecord,
        subject: Option<String>,
        mutation: Mutation,
    ) {
        RECORD_MUTATIONS_TOTAL
            .with_label_values(&[K::COLLECTION, mutation.action.as_str()])
            .inc();
        tracing::info!(
            collection = K::COLLECTION,
            code = %record.code,
            actor = %principal.user_id,
            action = mutation.action.as_str(),
            "Record {}",
            mutation.verb
        );

        let actor = principal.user_ref();
        self.audit
            .record(&actor, mutation.action, K::COLLECTION, &record.code)
            .await;
        self.notify(principal, &record.code, subject, mutation).await;
    }

    async fn notify(
        &self,
        principal: &Principal,
        code: &str,
        subject: Option<String>,
        mutation: Mutation,
    ) {
        let subject = subject.unwrap_or_else(|| "patient".to_string());
        self.notifications
            .emit(NotificationInput {
                recipient_id: principal.user_id.clone(),
                title: format!("{} {}", capitalize(K::LABEL), mutation.verb),
                message: format!(
                    "{} {} for {} was {} by {}",
                    capitalize(K::LABEL),
                    code,
                    subject,
                    mutation.verb,
                    principal.display_name()
                ),
                kind: mutation.kind,
                priority: mutation.priority,
                is_action_required: false,
                metadata: json!({
                    "collection": K::COLLECTION,
                    "recordId": code,
                    "action": mutation.action.as_str(),
                    "actorRole": principal.role.as_str(),
                }),
            })
            .await;
    }

    fn subject_of(&self, record: &StoredRecord) -> Option<String> {
        self.payload_of(record).and_then(|p| K::subject_name(&p))
    }

    pub async fn create(&self, principal: &Principal, body: JsonValue) -> Result<JsonValue> {
        principal.require_role(K::MUTATE_ROLES, &format!("create {}s", K::LABEL))?;

        let mut body = body;
        if let JsonValue::Object(map) = &mut body {
            strip_client_fields::<K>(map);
        }
        let payload: K::Payload = parse(body)?;

        let record = self.insert_payload(principal, &payload, CREATED).await?;
        Ok(self.view(&record))
    }

    /// Persist an already validated payload under a fresh formatted id.
    pub(crate) async fn insert_payload(
        &self,
        principal: &Principal,
        payload: &K::Payload,
        mutation: Mutation,
    ) -> Result<StoredRecord> {
        let value = serde_json::to_value(payload)
            .map_err(|e| Error::Internal(format!("Failed to serialize {}: {e}", K::LABEL)))?;

        let mut attempt = 0;
        let record = loop {
            attempt += 1;
            let now = Utc::now();
            let record = StoredRecord::new(
                K::COLLECTION,
                ids::generate(K::ID_PREFIX, now),
                value.clone(),
                principal.user_ref(),
                now,
            );
            match self.store.insert(&record).await {
                Ok(()) => break record,
                Err(Error::Conflict(_)) if attempt < ID_ATTEMPTS => {
                    tracing::debug!(code = %record.code, "Formatted id collision, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        self.after_mutation(principal, &record, K::subject_name(payload), mutation)
            .await;
        Ok(record)
    }

    pub async fn get(&self, code: &str) -> Result<JsonValue> {
        let record = self.load(code, LifecycleFilter::Active).await?;
        Ok(self.view(&record))
    }

    pub async fn get_record(&self, code: &str) -> Result<StoredRecord> {
        self.load(code, LifecycleFilter::Active).await
    }

    pub async fn list(&self, owner: Option<&str>) -> Result<Vec<JsonValue>> {
        let records = self
            .store
            .find(&RecordQuery::active(K::COLLECTION).owned_by(owner))
            .await?;
        Ok(self.views(&records))
    }

    pub async fn list_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>> {
        self.store.find(query).await
    }

    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<JsonValue>> {
        self.list(Some(&principal.user_id)).await
    }

    /// The caller's soft-deleted records.
    pub async fn list_deleted(&self, principal: &Principal) -> Result<Vec<JsonValue>> {
        let records = self
            .store
            .find(&RecordQuery::deleted(K::COLLECTION).owned_by(Some(&principal.user_id)))
            .await?;
        Ok(self.views(&records))
    }

    pub async fn count(&self, owner: Option<&str>) -> Result<i64> {
        self.store
            .count(&RecordQuery::active(K::COLLECTION).owned_by(owner))
            .await
    }

    pub async fn search(&self, name: &str, owner: Option<&str>) -> Result<Vec<JsonValue>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid("name", "is required"));
        }
        let records = self
            .store
            .find(
                &RecordQuery::active(K::COLLECTION)
                    .owned_by(owner)
                    .matching(K::NAME_FIELDS, name),
            )
            .await?;
        Ok(self.views(&records))
    }

    /// Inclusive on both ends.
    pub async fn list_by_date_range(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        owner: Option<&str>,
    ) -> Result<Vec<JsonValue>> {
        let (start, end) = parse_range(start, end)?;
        let records = self.records_dated_between(owner, start, end).await?;
        Ok(self.views(&records))
    }

    pub async fn records_dated_between(
        &self,
        owner: Option<&str>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StoredRecord>> {
        self.store
            .find(
                &RecordQuery::active(K::COLLECTION)
                    .owned_by(owner)
                    .dated_between(K::DATE_FIELD, start, end),
            )
            .await
    }

    /// Merge `patch` onto the stored payload and re-validate the result.
    ///
    /// PUT and PATCH share this path; audit and derived fields in the patch are ignored.
    pub async fn update(
        &self,
        principal: &Principal,
        code: &str,
        patch: JsonValue,
    ) -> Result<JsonValue> {
        principal.require_role(K::MUTATE_ROLES, &format!("update {}s", K::LABEL))?;
        let JsonValue::Object(mut patch) = patch else {
            return Err(Error::invalid("body", "must be a JSON object"));
        };

        let mut record = self.load(code, LifecycleFilter::Active).await?;
        self.ensure_owner(principal, &record, "update")?;

        let stripped = strip_client_fields::<K>(&mut patch);
        if !stripped.is_empty() {
            tracing::debug!(code, fields = ?stripped, "Ignored protected fields in update");
        }

        let mut merged = record.payload.clone();
        json_patch::merge(&mut merged, &JsonValue::Object(patch));
        let payload: K::Payload = parse(merged)?;
        let value = serde_json::to_value(&payload)
            .map_err(|e| Error::Internal(format!("Failed to serialize {}: {e}", K::LABEL)))?;

        record.apply_update(value, principal.user_ref(), Utc::now());
        self.store.replace(&record).await?;

        self.after_mutation(principal, &record, K::subject_name(&payload), UPDATED)
            .await;
        Ok(self.view(&record))
    }

    pub async fn delete(&self, principal: &Principal, code: &str) -> Result<JsonValue> {
        principal.require_role(K::MUTATE_ROLES, &format!("delete {}s", K::LABEL))?;
        let mut record = self.load(code, LifecycleFilter::Active).await?;
        self.ensure_owner(principal, &record, "delete")?;

        record.soft_delete(principal.user_ref(), Utc::now());
        self.store.replace(&record).await?;

        self.after_mutation(principal, &record, self.subject_of(&record), DELETED)
            .await;
        Ok(self.view(&record))
    }

    /// Only currently deleted records can be restored.
    pub async fn restore(&self, principal: &Principal, code: &str) -> Result<JsonValue> {
        principal.require_role(K::MUTATE_ROLES, &format!("restore {}s", K::LABEL))?;
        ids::ensure_valid(K::ID_PREFIX, K::ID_FIELD, code)?;
        let mut record = self
            .store
            .find_by_code(K::COLLECTION, code, LifecycleFilter::Deleted)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "{} not found or not deleted",
                    capitalize(K::LABEL)
                ))
            })?;
        self.ensure_owner(principal, &record, "restore")?;

        record.restore(Utc::now());
        self.store.replace(&record).await?;

        self.after_mutation(principal, &record, self.subject_of(&record), RESTORED)
            .await;
        Ok(self.view(&record))
    }

    /// Soft-delete every listed record the caller owns.
    ///
    /// Ownership of every matched record is checked before any write. The writes
    /// that follow run concurrently and are not rolled back on partial failure.
    pub async fn bulk_delete(
        &self,
        principal: &Principal,
        codes: Vec<String>,
    ) -> Result<BulkDeleteOutcome> {
        principal.require_role(K::MUTATE_ROLES, &format!("delete {}s", K::LABEL))?;
        if codes.is_empty() {
            return Err(Error::invalid("ids", "must contain at least one id"));
        }
        for (i, code) in codes.iter().enumerate() {
            ids::ensure_valid(K::ID_PREFIX, &format!("ids[{i}]"), code)?;
        }

        let records = self
            .store
            .find(&RecordQuery::active(K::COLLECTION).with_codes(codes))
            .await?;
        if records.is_empty() {
            return Err(Error::NotFound(format!(
                "No {}s found for the given ids",
                K::LABEL
            )));
        }
        if records.iter().any(|r| !r.is_owned_by(&principal.user_id)) {
            return Err(Error::Forbidden(format!(
                "You can only delete {}s you created",
                K::LABEL
            )));
        }

        let now = Utc::now();
        let actor = principal.user_ref();
        let writes = records.into_iter().map(|mut record| {
            let actor = actor.clone();
            async move {
                record.soft_delete(actor, now);
                self.store.replace(&record).await.map(|()| record)
            }
        });

        let mut deleted = Vec::new();
        let mut first_error = None;
        for result in join_all(writes).await {
            match result {
                Ok(record) => {
                    RECORD_MUTATIONS_TOTAL
                        .with_label_values(&[K::COLLECTION, AuditAction::BulkDelete.as_str()])
                        .inc();
                    self.audit
                        .record(&actor, AuditAction::BulkDelete, K::COLLECTION, &record.code)
                        .await;
                    deleted.push(record.code);
                }
                Err(e) => {
                    tracing::error!(collection = K::COLLECTION, "Bulk delete write failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!(
            collection = K::COLLECTION,
            actor = %principal.user_id,
            deleted = deleted.len(),
            "Bulk delete finished"
        );

        if !deleted.is_empty() {
            let subject = Some(format!("{} records", deleted.len()));
            let summary = deleted.join(", ");
            self.notify(principal, &summary, subject, DELETED).await;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(BulkDeleteOutcome { deleted }),
        }
    }
}

fn strip_client_fields<K: RecordKind>(map: &mut Map<String, JsonValue>) -> Vec<String> {
    let mut extra: Vec<&str> = vec![K::ID_FIELD];
    extra.extend_from_slice(K::derived_fields());
    sanitize_patch(map, &extra)
}

/// Parse `startDate`/`endDate` query values into an ordered inclusive range.
pub fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<(NaiveDate, NaiveDate)> {
    let mut errors = Vec::new();
    let mut parse_one = |field: &str, raw: Option<&str>| match raw.map(str::trim) {
        None | Some("") => {
            errors.push(crate::validation::FieldError::new(field, "is required"));
            None
        }
        Some(raw) => {
            let parsed = coerce_date(raw);
            if parsed.is_none() {
                errors.push(crate::validation::FieldError::new(
                    field,
                    "must be a date (YYYY-MM-DD)",
                ));
            }
            parsed
        }
    };
    let start = parse_one("startDate", start);
    let end = parse_one("endDate", end);

    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(Error::invalid(
            "endDate",
            "endDate must be on or after startDate",
        )),
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(Error::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_requires_both_ends_in_order() {
        assert!(parse_range(Some("2024-01-01"), Some("2024-01-31")).is_ok());
        assert!(parse_range(Some("2024-01-31"), Some("2024-01-31")).is_ok());

        let Err(Error::Validation(errors)) = parse_range(Some("2024-02-01"), Some("2024-01-01"))
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "endDate");

        let Err(Error::Validation(errors)) = parse_range(None, Some("nope")) else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["startDate", "endDate"]);
    }

    #[test]
    fn labels_capitalize() {
        assert_eq!(capitalize("referral slip"), "Referral slip");
        assert_eq!(capitalize(""), "");
    }
}
