//! In-memory transport implementation.
//!
//! Serves two roles: the "no backend configured" strategy selected at
//! composition time, and the scriptable double used throughout the test
//! suites. Frames are injected and drops forced through a [`SimulatedHandle`],
//! which stays valid after the transport itself is boxed into the client.

use super::{Frame, Transport, TransportIntent};
use crate::error::{Result, SyncError};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Default inbound frame buffer.
const DEFAULT_FRAME_BUFFER: usize = 256;

struct Shared {
    sender: Sender<Frame>,
    open: bool,
    /// Tokens passed to `open`, in order.
    opens: Vec<String>,
    /// Intents sent while open, in order.
    intents: Vec<TransportIntent>,
    /// Tokens that fail the handshake with an auth rejection.
    rejected_tokens: HashSet<String>,
    /// Remaining opens that fail at the transport level.
    failing_opens: u32,
}

/// Scriptable in-memory transport.
pub struct SimulatedTransport {
    shared: Arc<Mutex<Shared>>,
    receiver: Receiver<Frame>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_FRAME_BUFFER)
    }

    pub fn with_buffer(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            shared: Arc::new(Mutex::new(Shared {
                sender,
                open: false,
                opens: Vec::new(),
                intents: Vec::new(),
                rejected_tokens: HashSet::new(),
                failing_opens: 0,
            })),
            receiver,
        }
    }

    /// Handle for injecting frames and inspecting activity.
    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedTransport {
    fn open(&mut self, token: &str) -> Result<()> {
        let mut shared = self.shared.lock();
        shared.opens.push(token.to_string());

        if shared.rejected_tokens.contains(token) {
            return Err(SyncError::AuthRejected(format!(
                "token rejected for {}",
                token
            )));
        }
        if shared.failing_opens > 0 {
            shared.failing_opens -= 1;
            return Err(SyncError::TransportClosed("simulated open failure".into()));
        }

        shared.open = true;
        Ok(())
    }

    fn send(&mut self, intent: TransportIntent) -> Result<()> {
        let mut shared = self.shared.lock();
        if !shared.open {
            return Err(SyncError::TransportClosed("send while closed".into()));
        }
        shared.intents.push(intent);
        Ok(())
    }

    fn close(&mut self) {
        self.shared.lock().open = false;
    }

    fn frames(&self) -> Receiver<Frame> {
        self.receiver.clone()
    }
}

/// Handle to script a [`SimulatedTransport`] from outside the client.
#[derive(Clone)]
pub struct SimulatedHandle {
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedHandle {
    /// Inject a raw inbound frame. No-op if the connection is not open.
    pub fn push_frame(&self, raw: impl Into<String>) {
        let shared = self.shared.lock();
        if shared.open {
            let _ = shared.sender.try_send(Frame::Text(raw.into()));
        }
    }

    /// Drop the connection as if the network failed.
    pub fn drop_connection(&self) {
        let mut shared = self.shared.lock();
        if shared.open {
            shared.open = false;
            let _ = shared.sender.try_send(Frame::Closed);
        }
    }

    /// Make the handshake reject this token with an auth failure.
    pub fn reject_token(&self, token: impl Into<String>) {
        self.shared.lock().rejected_tokens.insert(token.into());
    }

    /// Make the next `n` opens fail at the transport level.
    pub fn fail_next_opens(&self, n: u32) {
        self.shared.lock().failing_opens = n;
    }

    /// Tokens passed to `open`, in order.
    pub fn opens(&self) -> Vec<String> {
        self.shared.lock().opens.clone()
    }

    /// Intents sent while open, in order.
    pub fn intents(&self) -> Vec<TransportIntent> {
        self.shared.lock().intents.clone()
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_send() {
        let mut transport = SimulatedTransport::new();
        let handle = transport.handle();

        transport.open("tok").unwrap();
        transport.send(TransportIntent::JoinNotifications).unwrap();

        assert_eq!(handle.opens(), vec!["tok".to_string()]);
        assert_eq!(handle.intents(), vec![TransportIntent::JoinNotifications]);
    }

    #[test]
    fn test_send_while_closed_fails() {
        let mut transport = SimulatedTransport::new();

        let result = transport.send(TransportIntent::JoinNotifications);
        assert!(matches!(result, Err(SyncError::TransportClosed(_))));
    }

    #[test]
    fn test_rejected_token() {
        let mut transport = SimulatedTransport::new();
        let handle = transport.handle();
        handle.reject_token("bad");

        let result = transport.open("bad");
        assert!(matches!(result, Err(SyncError::AuthRejected(_))));
        assert!(!handle.is_open());
    }

    #[test]
    fn test_frame_injection_requires_open() {
        let mut transport = SimulatedTransport::new();
        let handle = transport.handle();
        let frames = transport.frames();

        handle.push_frame("ignored");
        assert!(frames.try_recv().is_err());

        transport.open("tok").unwrap();
        handle.push_frame("{\"type\":\"x\"}");
        assert!(matches!(frames.try_recv(), Ok(Frame::Text(_))));
    }

    #[test]
    fn test_drop_emits_closed_frame() {
        let mut transport = SimulatedTransport::new();
        let handle = transport.handle();
        let frames = transport.frames();

        transport.open("tok").unwrap();
        handle.drop_connection();

        assert!(matches!(frames.try_recv(), Ok(Frame::Closed)));
        assert!(!handle.is_open());
    }
}
