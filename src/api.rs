//! REST collaborator interface.
//!
//! The sync core never talks HTTP directly; it consumes this trait. The
//! surface mirrors the backend's notification routes:
//!
//! - `GET /notifications?page&per_page&unread_only`
//! - `GET /notifications/unread-count`
//! - `PUT /notifications/:id/read`
//! - `PUT /notifications/read-all`
//!
//! All calls share the host API client's fixed timeout; a timeout is
//! reported as `SyncError::Timeout` and handled like any failed call.

use crate::error::Result;
use crate::types::{Notification, NotificationId, PageMeta};
use serde::{Deserialize, Serialize};

/// One page of the notification listing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub meta: PageMeta,
}

/// Query parameters for the listing endpoint.
#[derive(Clone, Copy, Debug)]
pub struct FetchQuery {
    pub page: u32,
    pub per_page: u32,
    pub unread_only: bool,
}

impl Default for FetchQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            unread_only: false,
        }
    }
}

/// Client for the notification REST surface.
///
/// The same bearer token used for the transport handshake authenticates
/// these calls; that is the integrator's responsibility.
pub trait NotificationsApi {
    /// Fetch a page of notifications.
    fn fetch(&self, query: FetchQuery) -> Result<NotificationPage>;

    /// Fetch the server's unread count. Advisory cross-check only.
    fn unread_count(&self) -> Result<u64>;

    /// Confirm a single notification as read.
    fn mark_read(&self, id: &NotificationId) -> Result<()>;

    /// Confirm every notification as read. All-or-nothing on the server.
    fn mark_all_read(&self) -> Result<()>;
}
