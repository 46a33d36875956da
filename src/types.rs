//! Core types for the notification sync core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable notification identifier.
///
/// Unique across both the REST snapshot and the push stream; the store keys
/// its cache on this.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        NotificationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotificationId({})", self.0)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        NotificationId(s.to_string())
    }
}

/// Kind of notification as reported by the server.
///
/// The backend emits free-form type strings; anything unrecognized maps to
/// `Generic` so the entity itself is never lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewAnswer,
    Vote,
    Mention,
    Bounty,
    Badge,
    Follow,
    #[serde(other)]
    Generic,
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::Generic
    }
}

/// A single notification entity.
///
/// At most one entity per `id` exists in the store; a push of an
/// already-known id is an upsert, never a duplicate insert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,

    #[serde(rename = "type", default)]
    pub kind: NotificationKind,

    #[serde(default)]
    pub message: String,

    /// Link target for the notification, if the server resolved one.
    #[serde(rename = "actionUrl", default)]
    pub action_url: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub is_read: bool,
}

/// Pagination metadata from the REST listing endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: u64,
}
