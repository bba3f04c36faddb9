//! Activity model consumed by the transcript pipeline.
//!
//! Activities are owned by the surrounding conversation store; the pipeline
//! only borrows slices of them and derives transient views. Identity equality
//! on [`ActivityId`] is used throughout for grouping and caching.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Stable identity of one conversation event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ActivityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which side of the conversation produced an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    User,
    Bot,
}

/// Delivery state reported by the conversation store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sending,
    Sent,
    Failed,
}

/// One conversation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Stable identity; activities without one are keyed by position instead.
    pub id: Option<ActivityId>,
    pub sender: SenderRole,
    pub status: DeliveryStatus,
    pub text: String,
    /// Structured display override, preferred over `text` when present.
    pub display_text: Option<String>,
    /// Free-form channel metadata passed through from the transport.
    #[serde(default)]
    pub channel_data: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Activity {
    /// Convenience constructor; hosts typically deserialize activities from
    /// their conversation store instead.
    pub fn new(id: impl Into<String>, sender: SenderRole, text: impl Into<String>) -> Self {
        Self {
            id: Some(ActivityId::new(id)),
            sender,
            status: DeliveryStatus::Sent,
            text: text.into(),
            display_text: None,
            channel_data: serde_json::Value::Null,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_display_text(mut self, display_text: impl Into<String>) -> Self {
        self.display_text = Some(display_text.into());
        self
    }

    /// Text used for announcements and live-region keys.
    pub fn effective_text(&self) -> &str {
        self.display_text.as_deref().unwrap_or(&self.text)
    }

    /// Stable key: own id when present, else the caller-supplied position.
    pub fn key_at(&self, position: usize) -> ActivityKey {
        match &self.id {
            Some(id) => ActivityKey::Id(id.clone()),
            None => ActivityKey::Index(position),
        }
    }
}

/// Key used for render descriptors, the mounted-element table and renderer
/// cache composites. Position-based keys are acceptable because the activity
/// list only grows and shrinks at the edges in normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityKey {
    Id(ActivityId),
    Index(usize),
}

impl ActivityKey {
    /// The underlying activity id, when this key carries one.
    pub fn activity_id(&self) -> Option<&ActivityId> {
        match self {
            ActivityKey::Id(id) => Some(id),
            ActivityKey::Index(_) => None,
        }
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKey::Id(id) => write!(f, "{id}"),
            ActivityKey::Index(position) => write!(f, "#{position}"),
        }
    }
}
