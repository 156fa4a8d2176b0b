//! Per-kind record metadata

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as JsonValue};
use validator::Validate;

use crate::auth::Role;

/// Static description of one record collection.
///
/// The record service, routes and storage queries are generic over this trait;
/// each collection only supplies its payload schema and a few field locations.
pub trait RecordKind: Send + Sync + 'static {
    type Payload: Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static;

    /// Storage collection name
    const COLLECTION: &'static str;
    /// Formatted id prefix (`RS`, `AAR`, ...)
    const ID_PREFIX: &'static str;
    /// Name of the formatted id in responses (`rsId`, `reportId`, ...)
    const ID_FIELD: &'static str;
    /// Lowercase human label used in messages
    const LABEL: &'static str;
    /// Roles allowed to create, update, delete and restore
    const MUTATE_ROLES: &'static [Role];
    /// JSON pointers searched by name queries
    const NAME_FIELDS: &'static [&'static str];
    /// JSON pointer to the record date used by date-range queries
    const DATE_FIELD: &'static str;

    /// Person or school the record is about, for notification text.
    fn subject_name(payload: &Self::Payload) -> Option<String>;

    /// Derived response fields computed from the payload.
    fn decorate(_payload: &Self::Payload, _view: &mut Map<String, JsonValue>) {}

    /// Response fields that are derived and must be stripped from patches.
    fn derived_fields() -> &'static [&'static str] {
        &[]
    }
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
