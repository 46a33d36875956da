//! Per-session channel membership.
//!
//! The join does not survive a reconnect: the server scopes membership to
//! the live connection, so the registry re-issues the intent on every
//! transition into the authenticated state. Join is at-least-once and must
//! be idempotent on the receiving side; events may arrive before any
//! explicit confirmation.

use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::transport::TransportIntent;
use tracing::debug;

/// Emits join/leave intents for the notification channel.
///
/// Holds no channel state of its own; intents are scoped to whatever
/// connection the manager currently owns.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    joins_emitted: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a join intent on the current connection.
    ///
    /// Call once per successful authentication, including after every
    /// reconnect.
    pub fn join(&mut self, connection: &mut ConnectionManager) -> Result<()> {
        connection.send(TransportIntent::JoinNotifications)?;
        self.joins_emitted += 1;
        debug!(total = self.joins_emitted, "joined notification channel");
        Ok(())
    }

    /// Emit a leave intent, best-effort. Failure is not surfaced.
    pub fn leave(&mut self, connection: &mut ConnectionManager) {
        let _ = connection.send(TransportIntent::LeaveNotifications);
    }

    /// Number of join intents emitted over the registry's lifetime.
    pub fn joins_emitted(&self) -> u64 {
        self.joins_emitted
    }
}
