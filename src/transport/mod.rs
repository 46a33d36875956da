//! Transport abstraction for the push stream.
//!
//! The persistent connection is modelled as an explicitly owned,
//! constructible resource injected into the connection manager, selected at
//! composition time. `SimulatedTransport` is the interface-compatible
//! no-backend strategy and the test double.

pub mod backoff;
pub mod simulated;

pub use backoff::{delay_for_attempt, BackoffConfig};
pub use simulated::{SimulatedHandle, SimulatedTransport};

use crate::error::Result;
use crossbeam_channel::Receiver;

/// Outbound fire-and-forget intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportIntent {
    JoinNotifications,
    LeaveNotifications,
}

impl TransportIntent {
    /// Name of the intent on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TransportIntent::JoinNotifications => "join_notifications",
            TransportIntent::LeaveNotifications => "leave_notifications",
        }
    }
}

/// An inbound occurrence on the transport.
#[derive(Clone, Debug)]
pub enum Frame {
    /// A raw text payload. Decoding happens in [`crate::events`].
    Text(String),

    /// The connection was dropped by the peer or the network.
    Closed,
}

/// A persistent push transport.
///
/// Implementations must carry the token inside the handshake payload, never
/// appended to a URL, so it cannot leak into access logs.
pub trait Transport {
    /// Establish the connection and authenticate with `token`.
    ///
    /// `Err(SyncError::AuthRejected)` means the credentials were refused;
    /// any other error is a transport-level failure.
    fn open(&mut self, token: &str) -> Result<()>;

    /// Send a fire-and-forget intent on the open connection.
    fn send(&mut self, intent: TransportIntent) -> Result<()>;

    /// Close the connection. Idempotent.
    fn close(&mut self);

    /// Channel of inbound frames for the current and future connections.
    fn frames(&self) -> Receiver<Frame>;
}
