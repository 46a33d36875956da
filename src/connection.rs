//! Connection lifecycle management.
//!
//! Owns the transport and the connection state machine:
//!
//! ```text
//! disconnected --connect()--> connecting --auth_ok--> connected
//! connecting --auth_fail--> disconnected            (terminal, surfaced)
//! connected --transport_drop--> reconnecting --timer--> connecting
//! connected --disconnect()--> closed                (terminal until connect())
//! ```
//!
//! Reconnect timing is driven externally through [`ConnectionManager::tick`]
//! with an explicit `Instant`, so the schedule is deterministic under test.

use crate::error::{Result, SyncError};
use crate::transport::{delay_for_attempt, BackoffConfig, Frame, Transport, TransportIntent};
use crossbeam_channel::Receiver;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle state of the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Transport is open and the handshake was accepted.
    Connected,
    /// Transport dropped; a retry is scheduled.
    Reconnecting { attempt: u32, retry_at: Instant },
    /// Explicitly disconnected. No automatic reconnects until `connect()`.
    Closed,
}

/// Owns the persistent transport connection.
pub struct ConnectionManager {
    transport: Box<dyn Transport>,
    backoff: BackoffConfig,
    state: ConnectionState,
    token: Option<String>,
}

impl ConnectionManager {
    pub fn new(transport: Box<dyn Transport>, backoff: BackoffConfig) -> Result<Self> {
        backoff.validate()?;
        Ok(Self {
            transport,
            backoff,
            state: ConnectionState::Disconnected,
            token: None,
        })
    }

    /// Establish the connection with `token`.
    ///
    /// Idempotent while already connected or connecting with the same token.
    /// A different token (re-login as another user) tears the prior
    /// connection down fully before establishing a new one. An auth
    /// rejection is terminal: the state returns to `Disconnected` and no
    /// retry is scheduled.
    pub fn connect(&mut self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(SyncError::NoSession);
        }

        let same_token = self.token.as_deref() == Some(token);
        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting if same_token => {
                return Ok(());
            }
            ConnectionState::Connected | ConnectionState::Connecting => {
                info!("token changed, tearing down prior connection");
                self.teardown();
            }
            _ => {}
        }

        self.token = Some(token.to_string());
        self.state = ConnectionState::Connecting;

        match self.transport.open(token) {
            Ok(()) => {
                info!("connection authenticated");
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Close the connection for good (until a fresh `connect()`).
    ///
    /// Leaves the channel first, best-effort.
    pub fn disconnect(&mut self) {
        self.teardown();
        self.state = ConnectionState::Closed;
    }

    /// React to a transport drop: schedule the first reconnect attempt.
    ///
    /// Drops while not connected (including after `disconnect()`) are
    /// ignored; `Closed` is terminal.
    pub fn handle_drop(&mut self, now: Instant) {
        if self.state != ConnectionState::Connected {
            return;
        }
        let delay = delay_for_attempt(self.backoff, 0);
        warn!(?delay, "transport dropped, scheduling reconnect");
        self.state = ConnectionState::Reconnecting {
            attempt: 0,
            retry_at: now + delay,
        };
    }

    /// Advance the reconnect schedule.
    ///
    /// Returns `true` when this call transitioned back into `Connected`,
    /// which is the signal for the caller to re-issue its join and refresh
    /// the snapshot. Retries indefinitely with growing backoff; only an auth
    /// rejection stops the cycle.
    pub fn tick(&mut self, now: Instant) -> bool {
        let ConnectionState::Reconnecting { attempt, retry_at } = self.state else {
            return false;
        };
        if now < retry_at {
            return false;
        }

        let token = match self.token.clone() {
            Some(t) => t,
            None => {
                self.state = ConnectionState::Disconnected;
                return false;
            }
        };

        match self.transport.open(&token) {
            Ok(()) => {
                info!(attempt, "reconnected");
                self.state = ConnectionState::Connected;
                true
            }
            Err(SyncError::AuthRejected(reason)) => {
                // Token went invalid during the outage. No caller to surface
                // this to; stop retrying until a fresh connect().
                error!(%reason, "authentication rejected during reconnect");
                self.state = ConnectionState::Disconnected;
                false
            }
            Err(e) => {
                let next = attempt.saturating_add(1);
                let delay = delay_for_attempt(self.backoff, next);
                debug!(error = %e, attempt = next, ?delay, "reconnect attempt failed");
                self.state = ConnectionState::Reconnecting {
                    attempt: next,
                    retry_at: now + delay,
                };
                false
            }
        }
    }

    /// Send a fire-and-forget intent on the open connection.
    pub fn send(&mut self, intent: TransportIntent) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(SyncError::NotConnected);
        }
        debug!(intent = intent.wire_name(), "sending intent");
        self.transport.send(intent)
    }

    /// Inbound frames from the transport.
    pub fn frames(&self) -> Receiver<Frame> {
        self.transport.frames()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn teardown(&mut self) {
        if self.state == ConnectionState::Connected {
            // Best-effort; failure to leave must not block the close.
            let _ = self.transport.send(TransportIntent::LeaveNotifications);
        }
        self.transport.close();
        self.state = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{SimulatedHandle, SimulatedTransport};
    use std::time::Duration;

    fn manager() -> (ConnectionManager, SimulatedHandle) {
        let transport = SimulatedTransport::new();
        let handle = transport.handle();
        let backoff = BackoffConfig {
            jitter: 0.0,
            ..Default::default()
        };
        (
            ConnectionManager::new(Box::new(transport), backoff).unwrap(),
            handle,
        )
    }

    #[test]
    fn test_connect_is_idempotent_for_same_token() {
        let (mut conn, handle) = manager();

        conn.connect("tok").unwrap();
        conn.connect("tok").unwrap();
        conn.connect("tok").unwrap();

        assert_eq!(handle.opens(), vec!["tok".to_string()]);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_connect_without_token_fails() {
        let (mut conn, _handle) = manager();
        assert!(matches!(conn.connect(""), Err(SyncError::NoSession)));
    }

    #[test]
    fn test_token_change_tears_down_first() {
        let (mut conn, handle) = manager();

        conn.connect("alice").unwrap();
        conn.connect("bob").unwrap();

        assert_eq!(
            handle.opens(),
            vec!["alice".to_string(), "bob".to_string()]
        );
        // The old connection left the channel before closing.
        assert_eq!(
            handle.intents(),
            vec![TransportIntent::LeaveNotifications]
        );
        assert!(conn.is_connected());
    }

    #[test]
    fn test_auth_rejection_is_terminal() {
        let (mut conn, handle) = manager();
        handle.reject_token("bad");

        let result = conn.connect("bad");
        assert!(matches!(result, Err(SyncError::AuthRejected(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        // No retry was scheduled.
        assert!(!conn.tick(Instant::now() + Duration::from_secs(60)));
    }

    #[test]
    fn test_drop_schedules_reconnect_with_backoff() {
        let (mut conn, handle) = manager();
        conn.connect("tok").unwrap();

        let t0 = Instant::now();
        handle.drop_connection();
        conn.handle_drop(t0);

        match conn.state() {
            ConnectionState::Reconnecting { attempt, retry_at } => {
                assert_eq!(attempt, 0);
                assert_eq!(retry_at, t0 + Duration::from_secs(1));
            }
            other => panic!("Expected Reconnecting, got {:?}", other),
        }

        // Too early: nothing happens.
        assert!(!conn.tick(t0));
        // At the deadline the reconnect succeeds.
        assert!(conn.tick(t0 + Duration::from_secs(1)));
        assert!(conn.is_connected());
        assert_eq!(handle.opens().len(), 2);
    }

    #[test]
    fn test_failed_reconnects_grow_delay() {
        let (mut conn, handle) = manager();
        conn.connect("tok").unwrap();

        let t0 = Instant::now();
        handle.drop_connection();
        conn.handle_drop(t0);
        handle.fail_next_opens(2);

        let t1 = t0 + Duration::from_secs(1);
        assert!(!conn.tick(t1));
        match conn.state() {
            ConnectionState::Reconnecting { attempt, retry_at } => {
                assert_eq!(attempt, 1);
                assert_eq!(retry_at, t1 + Duration::from_secs(2));
            }
            other => panic!("Expected Reconnecting, got {:?}", other),
        }

        let t2 = t1 + Duration::from_secs(2);
        assert!(!conn.tick(t2));
        match conn.state() {
            ConnectionState::Reconnecting { attempt, retry_at } => {
                assert_eq!(attempt, 2);
                assert_eq!(retry_at, t2 + Duration::from_secs(4));
            }
            other => panic!("Expected Reconnecting, got {:?}", other),
        }

        // Third attempt goes through.
        assert!(conn.tick(t2 + Duration::from_secs(4)));
        assert!(conn.is_connected());
    }

    #[test]
    fn test_disconnect_is_terminal() {
        let (mut conn, handle) = manager();
        conn.connect("tok").unwrap();
        conn.disconnect();

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(
            handle.intents(),
            vec![TransportIntent::LeaveNotifications]
        );
        assert!(!handle.is_open());

        // A drop after disconnect schedules nothing.
        conn.handle_drop(Instant::now());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.tick(Instant::now() + Duration::from_secs(60)));

        // A fresh connect() works again.
        conn.connect("tok").unwrap();
        assert!(conn.is_connected());
    }

    #[test]
    fn test_send_requires_connection() {
        let (mut conn, _handle) = manager();
        let result = conn.send(TransportIntent::JoinNotifications);
        assert!(matches!(result, Err(SyncError::NotConnected)));
    }

    #[test]
    fn test_auth_rejection_during_reconnect_stops_retrying() {
        let (mut conn, handle) = manager();
        conn.connect("tok").unwrap();

        let t0 = Instant::now();
        handle.drop_connection();
        conn.handle_drop(t0);

        // Token invalidated during the outage.
        handle.reject_token("tok");
        assert!(!conn.tick(t0 + Duration::from_secs(1)));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.tick(t0 + Duration::from_secs(60)));
    }
}
