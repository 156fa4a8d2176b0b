//! In-app notifications emitted by record mutations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    RecordRestored,
    ReportGenerated,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RecordCreated => "record_created",
            NotificationKind::RecordUpdated => "record_updated",
            NotificationKind::RecordDeleted => "record_deleted",
            NotificationKind::RecordRestored => "record_restored",
            NotificationKind::ReportGenerated => "report_generated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "record_created" => Some(NotificationKind::RecordCreated),
            "record_updated" => Some(NotificationKind::RecordUpdated),
            "record_deleted" => Some(NotificationKind::RecordDeleted),
            "record_restored" => Some(NotificationKind::RecordRestored),
            "report_generated" => Some(NotificationKind::ReportGenerated),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// What a record mutation asks the notification subsystem to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationInput {
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    pub is_action_required: bool,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub is_action_required: bool,
    pub is_read: bool,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn from_input(input: NotificationInput, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id: input.recipient_id,
            title: input.title,
            message: input.message,
            kind: input.kind,
            priority: input.priority,
            is_action_required: input.is_action_required,
            is_read: false,
            metadata: input.metadata,
            created_at: now,
            read_at: None,
        }
    }
}
