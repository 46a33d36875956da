//! Snapshot fan-out for the presentation layer.
//!
//! Consumers subscribe through a typed handle and receive a full
//! [`SyncSnapshot`] after every observable change. The presentation layer
//! owns no notification state of its own; it renders whatever the latest
//! snapshot says.

use crate::types::Notification;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Configuration for a watcher.
#[derive(Clone, Copy, Debug)]
pub struct WatchConfig {
    /// Max buffered snapshots before the watcher is dropped.
    pub buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { buffer_size: 64 }
    }
}

/// Point-in-time view handed to consumers.
#[derive(Clone, Debug)]
pub struct SyncSnapshot {
    /// All cached notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Derived from the notifications; never set directly.
    pub unread_count: usize,
    pub is_connected: bool,
}

/// Unique identifier for a watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Handle to receive snapshots.
pub struct WatchHandle {
    pub id: WatchId,
    pub receiver: Receiver<SyncSnapshot>,
}

impl WatchHandle {
    /// Receive the next snapshot (blocking).
    pub fn recv(&self) -> Result<SyncSnapshot, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot (non-blocking).
    pub fn try_recv(&self) -> Result<SyncSnapshot, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything buffered and return the most recent snapshot.
    pub fn latest(&self) -> Option<SyncSnapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.receiver.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }
}

/// Manages watchers and broadcasts snapshots.
pub struct WatchBus {
    watchers: RwLock<HashMap<WatchId, Sender<SyncSnapshot>>>,
    next_id: AtomicU64,
}

impl WatchBus {
    pub fn new() -> Self {
        Self {
            watchers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new watcher.
    pub fn watch(&self, config: WatchConfig) -> WatchHandle {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);
        self.watchers.write().insert(id, sender);
        WatchHandle { id, receiver }
    }

    /// Remove a watcher.
    pub fn unwatch(&self, id: WatchId) {
        self.watchers.write().remove(&id);
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    /// Broadcast a snapshot. Watchers with a full buffer are dropped.
    pub fn broadcast(&self, snapshot: SyncSnapshot) {
        let mut to_remove = Vec::new();

        {
            let watchers = self.watchers.read();
            for (id, sender) in watchers.iter() {
                if sender.try_send(snapshot.clone()).is_err() {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut watchers = self.watchers.write();
            for id in to_remove {
                watchers.remove(&id);
            }
        }
    }
}

impl Default for WatchBus {
    fn default() -> Self {
        Self::new()
    }
}
