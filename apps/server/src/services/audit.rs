//! Audit-trail writes for record mutations.
//!
//! Best-effort like notifications: persistence errors are logged, never
//! propagated to the request.

use chrono::Utc;
use std::sync::Arc;

use crate::{
    db::AuditTrailStore,
    models::{AuditAction, AuditEntry, UserRef},
    Result,
};

#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditTrailStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditTrailStore>) -> Self {
        Self { store }
    }

    pub async fn record(&self, actor: &UserRef, action: AuditAction, collection: &str, code: &str) {
        let mut entry = AuditEntry::new(actor.clone(), action, collection, code, Utc::now());
        entry.request_id = crate::api::middleware::request_id::current_request_id();

        if let Err(e) = self.store.insert_audit(&entry).await {
            tracing::warn!(
                collection,
                code,
                action = action.as_str(),
                "Failed to persist audit_trail row: {}",
                e
            );
        }
    }

    pub async fn history(&self, collection: &str, code: &str) -> Result<Vec<AuditEntry>> {
        self.store.list_for_record(collection, code).await
    }
}
