//! Stored record envelope shared by every record kind

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::auth::Role;

/// Reference to the user who performed an action, populated from the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Soft-delete state. Records are never physically removed.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Active,
    Deleted {
        deleted_at: DateTime<Utc>,
        deleted_by: UserRef,
    },
}

impl Lifecycle {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Lifecycle::Deleted { .. })
    }
}

/// Which lifecycle state a lookup should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleFilter {
    Active,
    Deleted,
}

impl LifecycleFilter {
    pub fn matches(&self, lifecycle: &Lifecycle) -> bool {
        match self {
            LifecycleFilter::Active => !lifecycle.is_deleted(),
            LifecycleFilter::Deleted => lifecycle.is_deleted(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Storage surrogate key
    pub id: Uuid,
    pub collection: String,
    /// Formatted external id (e.g. `RS-20240115-AB12CD`)
    pub code: String,
    pub payload: JsonValue,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<UserRef>,
    pub updated_at: DateTime<Utc>,
    pub lifecycle: Lifecycle,
}

impl StoredRecord {
    pub fn new(
        collection: &str,
        code: String,
        payload: JsonValue,
        created_by: UserRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection: collection.to_string(),
            code,
            payload,
            created_by,
            created_at: now,
            updated_by: None,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by.id == user_id
    }

    /// Replace the payload and stamp the editor.
    pub fn apply_update(&mut self, payload: JsonValue, actor: UserRef, now: DateTime<Utc>) {
        self.payload = payload;
        self.updated_by = Some(actor);
        self.updated_at = now;
    }

    /// Active → Deleted. Returns false when already deleted.
    pub fn soft_delete(&mut self, actor: UserRef, now: DateTime<Utc>) -> bool {
        if self.lifecycle.is_deleted() {
            return false;
        }
        self.lifecycle = Lifecycle::Deleted {
            deleted_at: now,
            deleted_by: actor,
        };
        self.updated_at = now;
        true
    }

    /// Deleted → Active, clearing all deletion metadata. Returns false when not deleted.
    pub fn restore(&mut self, now: DateTime<Utc>) -> bool {
        if !self.lifecycle.is_deleted() {
            return false;
        }
        self.lifecycle = Lifecycle::Active;
        self.updated_at = now;
        true
    }

    /// String value at a JSON pointer inside the payload.
    pub fn payload_str(&self, pointer: &str) -> Option<&str> {
        self.payload.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Response shape: payload fields plus id and audit fields at the top level.
    pub fn to_json(&self, id_field: &str) -> JsonValue {
        let mut out = Map::new();
        out.insert("id".to_string(), JsonValue::String(self.code.clone()));
        out.insert(id_field.to_string(), JsonValue::String(self.code.clone()));

        if let JsonValue::Object(fields) = &self.payload {
            for (k, v) in fields {
                out.insert(k.clone(), v.clone());
            }
        }

        out.insert("createdBy".to_string(), json_of(&self.created_by));
        out.insert("createdAt".to_string(), json_of(&self.created_at));
        out.insert(
            "updatedBy".to_string(),
            self.updated_by
                .as_ref()
                .map(json_of)
                .unwrap_or(JsonValue::Null),
        );
        out.insert("updatedAt".to_string(), json_of(&self.updated_at));

        let (deleted_at, deleted_by) = match &self.lifecycle {
            Lifecycle::Active => (JsonValue::Null, JsonValue::Null),
            Lifecycle::Deleted {
                deleted_at,
                deleted_by,
            } => (json_of(deleted_at), json_of(deleted_by)),
        };
        out.insert(
            "isDeleted".to_string(),
            JsonValue::Bool(self.lifecycle.is_deleted()),
        );
        out.insert("deletedAt".to_string(), deleted_at);
        out.insert("deletedBy".to_string(), deleted_by);

        JsonValue::Object(out)
    }
}

fn json_of<T: Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

/// Fields a client may never set through an update.
pub const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "_id",
    "createdBy",
    "createdAt",
    "updatedBy",
    "updatedAt",
    "isDeleted",
    "deletedAt",
    "deletedBy",
];

/// Drop protected and derived fields from a patch. Returns the names removed.
pub fn sanitize_patch(patch: &mut Map<String, JsonValue>, extra: &[&str]) -> Vec<String> {
    let mut removed = Vec::new();
    for key in PROTECTED_FIELDS.iter().chain(extra.iter()) {
        if patch.remove(*key).is_some() {
            removed.push((*key).to_string());
        }
    }
    removed
}
