//! Inbound push event contract.
//!
//! Exactly two payload shapes are legal on the push stream. Anything else
//! is dropped without effect; a malformed frame must never crash the stream
//! or the caller.

use crate::types::Notification;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A push event delivered over the persistent connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// A new (or re-delivered) notification entity.
    NewNotification { notification: Notification },

    /// The server's view of the unread count. Advisory only: the locally
    /// derived count remains authoritative.
    NotificationCountUpdate { unread_count: u64 },
}

/// Decode a raw inbound frame into a push event.
///
/// Returns `None` for unparseable frames and for frames whose `type` is not
/// one of the two legal shapes; both cases are logged and discarded.
pub fn decode_frame(raw: &str) -> Option<PushEvent> {
    match serde_json::from_str::<PushEvent>(raw) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "dropping malformed push frame");
            None
        }
    }
}
