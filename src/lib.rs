//! # Notification Sync Core
//!
//! A client-side synchronization core for a Q&A platform's notifications.
//! Maintains a locally accurate, eventually consistent view of a user's
//! notifications and unread count by merging an authoritative paginated
//! REST snapshot with an asynchronous push stream, with optimistic
//! mark-as-read mutations that survive network failure without corrupting
//! the unread count.
//!
//! ## Core Concepts
//!
//! - **Reconciliation store**: one entity per id; the unread count is always
//!   derived from the cache, never set directly
//! - **Connection lifecycle**: authenticated transport with backoff
//!   reconnects; join re-issued on every reconnect
//! - **Advisory counts**: the server's count pushes are cross-checks only;
//!   persistent divergence triggers a full refresh
//!
//! ## Example
//!
//! ```ignore
//! use notisync::{ClientConfig, NotificationClient, SimulatedTransport};
//!
//! let transport = SimulatedTransport::new();
//! let mut client = NotificationClient::new(
//!     ClientConfig::default(),
//!     Box::new(transport),
//!     api_client,
//! )?;
//!
//! client.start(session_token)?;
//! let watcher = client.watch();
//!
//! // In the host event loop:
//! client.pump(Instant::now());
//! client.tick(Instant::now())?;
//! if let Some(snapshot) = watcher.latest() {
//!     render(snapshot.notifications, snapshot.unread_count);
//! }
//! ```

pub mod api;
pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod store;
pub mod subscription;
pub mod transport;
pub mod types;
pub mod watch;

// Re-exports
pub use api::{FetchQuery, NotificationPage, NotificationsApi};
pub use client::{ClientConfig, NotificationClient};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{Result, SyncError};
pub use events::PushEvent;
pub use store::ReconciliationStore;
pub use subscription::SubscriptionRegistry;
pub use transport::{
    BackoffConfig, Frame, SimulatedHandle, SimulatedTransport, Transport, TransportIntent,
};
pub use types::*;
pub use watch::{SyncSnapshot, WatchBus, WatchConfig, WatchHandle, WatchId};
