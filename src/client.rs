//! Composition root tying the sync components together.
//!
//! Session flow: `start(token)` connects and authenticates, joins the
//! notification channel, and seeds the store from the REST snapshot. The
//! host's event loop then calls [`NotificationClient::pump`] to drain
//! inbound frames and [`NotificationClient::tick`] to drive reconnects.
//! Mutations go through the client so every observable change produces a
//! snapshot broadcast.

use crate::api::{FetchQuery, NotificationsApi};
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{Result, SyncError};
use crate::events;
use crate::store::ReconciliationStore;
use crate::subscription::SubscriptionRegistry;
use crate::transport::{BackoffConfig, Frame, Transport};
use crate::types::{Notification, NotificationId, PageMeta};
use crate::watch::{SyncSnapshot, WatchBus, WatchConfig, WatchHandle, WatchId};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Client configuration.
#[derive(Clone, Copy, Debug)]
pub struct ClientConfig {
    /// Reconnect backoff policy.
    pub backoff: BackoffConfig,

    /// Consecutive divergent advisory counts before an automatic refresh.
    /// Default: 3
    pub divergence_threshold: u32,

    /// Query used for the initial seed and refreshes.
    pub fetch: FetchQuery,

    /// Snapshot buffer per watcher.
    pub watch_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            divergence_threshold: 3,
            fetch: FetchQuery::default(),
            watch_buffer: 64,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        self.backoff.validate()?;
        if self.divergence_threshold == 0 {
            return Err(SyncError::InvalidConfig(
                "divergence threshold must be >= 1".into(),
            ));
        }
        if self.fetch.per_page == 0 {
            return Err(SyncError::InvalidConfig("per_page must be >= 1".into()));
        }
        Ok(())
    }
}

/// The notification sync client.
///
/// Single-threaded cooperative: all store mutations execute synchronously
/// within one call, so temporal interleaving between calls is the only
/// hazard, and that is handled inside the store.
pub struct NotificationClient {
    config: ClientConfig,
    connection: ConnectionManager,
    registry: SubscriptionRegistry,
    store: ReconciliationStore,
    watch: WatchBus,
    frames: Receiver<Frame>,
}

impl NotificationClient {
    pub fn new(
        config: ClientConfig,
        transport: Box<dyn Transport>,
        api: Arc<dyn NotificationsApi>,
    ) -> Result<Self> {
        config.validate()?;
        let connection = ConnectionManager::new(transport, config.backoff)?;
        let frames = connection.frames();
        let store = ReconciliationStore::new(api, config.divergence_threshold, config.fetch);
        Ok(Self {
            config,
            connection,
            registry: SubscriptionRegistry::new(),
            store,
            watch: WatchBus::new(),
            frames,
        })
    }

    // --- Lifecycle ---

    /// Connect, authenticate, join the notification channel, and seed the
    /// store from the REST snapshot.
    ///
    /// An auth rejection is surfaced and terminal. A seed failure leaves
    /// the connection up; an explicit `refresh()` can recover.
    pub fn start(&mut self, token: &str) -> Result<()> {
        self.connection.connect(token)?;
        self.registry.join(&mut self.connection)?;
        let result = self.store.refresh();
        self.broadcast();
        result
    }

    /// Drain and apply buffered inbound frames.
    ///
    /// Returns the number of frames processed. A `Closed` frame schedules
    /// a reconnect; within one connection, frames are applied in delivery
    /// order.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut processed = 0;
        while let Ok(frame) = self.frames.try_recv() {
            processed += 1;
            match frame {
                Frame::Text(raw) => {
                    if let Some(event) = events::decode_frame(&raw) {
                        self.store.apply_push(event);
                    }
                }
                Frame::Closed => {
                    self.connection.handle_drop(now);
                }
            }
        }
        if processed > 0 {
            self.broadcast();
        }
        processed
    }

    /// Advance the reconnect schedule.
    ///
    /// When a reconnect completes, the join is re-issued (it does not
    /// survive the old connection) and the store is refreshed to recover
    /// events generated during the outage. Returns `true` on a completed
    /// reconnect.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        if !self.connection.tick(now) {
            return Ok(false);
        }

        self.registry.join(&mut self.connection)?;
        if let Err(e) = self.store.refresh() {
            // Stale until the next refresh; not fatal.
            warn!(error = %e, "post-reconnect refresh failed");
        }
        self.broadcast();
        Ok(true)
    }

    /// Tear the session down. Terminal until the next `start()`.
    ///
    /// In-flight confirmation results are discarded from here on; the
    /// transport is force-closed and will not auto-reconnect.
    pub fn shutdown(&mut self) {
        self.store.invalidate();
        self.connection.disconnect();
        self.broadcast();
    }

    // --- Mutations ---

    /// Optimistically mark one notification as read.
    pub fn mark_read(&mut self, id: &NotificationId) -> Result<()> {
        let result = self.store.mark_read(id);
        self.broadcast();
        result
    }

    /// Optimistically mark everything as read.
    pub fn mark_all_read(&mut self) -> Result<()> {
        let result = self.store.mark_all_read();
        self.broadcast();
        result
    }

    /// Cross-check the derived count against the REST `unread-count`
    /// endpoint. Advisory, like the push variant.
    pub fn cross_check_unread(&mut self) -> Result<()> {
        let result = self.store.cross_check_unread();
        self.broadcast();
        result
    }

    /// Full manual refresh from the REST snapshot.
    pub fn refresh(&mut self) -> Result<()> {
        let result = self.store.refresh();
        self.broadcast();
        result
    }

    /// Fetch and merge one additional listing page.
    pub fn load_page(&mut self, page: u32) -> Result<PageMeta> {
        let result = self.store.load_page(page);
        self.broadcast();
        result
    }

    // --- Reads ---

    /// Register a snapshot watcher.
    pub fn watch(&self) -> WatchHandle {
        self.watch.watch(WatchConfig {
            buffer_size: self.config.watch_buffer,
        })
    }

    pub fn unwatch(&self, id: WatchId) {
        self.watch.unwatch(id);
    }

    /// Current point-in-time view.
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            notifications: self.store.notifications(),
            unread_count: self.store.unread_count(),
            is_connected: self.connection.is_connected(),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store.notifications()
    }

    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Join intents emitted so far (one per successful authentication).
    pub fn joins_emitted(&self) -> u64 {
        self.registry.joins_emitted()
    }

    fn broadcast(&self) {
        self.watch.broadcast(self.snapshot());
    }
}
