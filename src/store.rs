//! Reconciliation store: the authoritative local view of notifications.
//!
//! Unifies the paginated REST snapshot with the push stream. The unread
//! count is never stored; it is always derived from the cache, so no code
//! path can set the badge number directly. The server's own count pushes
//! are advisory cross-checks only.

use crate::api::{FetchQuery, NotificationsApi};
use crate::error::Result;
use crate::events::PushEvent;
use crate::types::{Notification, NotificationId, PageMeta};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// In-memory cache of notification entities plus reconciliation state.
pub struct ReconciliationStore {
    api: Arc<dyn NotificationsApi>,
    entries: HashMap<NotificationId, Notification>,

    /// Consecutive advisory count events that disagreed with the derived
    /// count. Reset by any agreeing advisory and by a refresh.
    divergence_streak: u32,
    divergence_threshold: u32,

    refresh_query: FetchQuery,

    /// Bumped at teardown; confirmation results that straddle a bump are
    /// discarded (no commit echo, no rollback).
    generation: Arc<AtomicU64>,
}

impl ReconciliationStore {
    pub fn new(
        api: Arc<dyn NotificationsApi>,
        divergence_threshold: u32,
        refresh_query: FetchQuery,
    ) -> Self {
        Self {
            api,
            entries: HashMap::new(),
            divergence_streak: 0,
            divergence_threshold,
            refresh_query,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    // --- Snapshot ingestion ---

    /// Replace the cache from a REST page.
    ///
    /// The REST snapshot is authoritative per entity; called after the first
    /// successful fetch and after any full refresh.
    pub fn seed(&mut self, items: Vec<Notification>) {
        self.entries.clear();
        for n in items {
            self.entries.insert(n.id.clone(), n);
        }
        self.divergence_streak = 0;
    }

    /// Merge an additional REST page into the cache (upsert, entity
    /// replaced as-is).
    pub fn merge_page(&mut self, items: Vec<Notification>) {
        for n in items {
            self.entries.insert(n.id.clone(), n);
        }
    }

    /// Re-fetch the first page and reseed the cache.
    pub fn refresh(&mut self) -> Result<()> {
        let page = self.api.fetch(self.refresh_query)?;
        self.seed(page.items);
        Ok(())
    }

    /// Fetch and merge one additional page. Returns its pagination metadata.
    pub fn load_page(&mut self, page: u32) -> Result<PageMeta> {
        let query = FetchQuery {
            page,
            ..self.refresh_query
        };
        let fetched = self.api.fetch(query)?;
        self.merge_page(fetched.items);
        Ok(fetched.meta)
    }

    // --- Push ingestion ---

    /// Apply one push event.
    ///
    /// `new_notification` is an upsert by id, never a duplicate insert; an
    /// upsert never regresses `is_read` from true back to false, which is
    /// what protects an optimistic mark-read against a racing re-delivery.
    /// `notification_count_update` is compared against the derived count
    /// only; persistent divergence triggers a full refresh, the recovery
    /// path for pushes missed during an outage.
    pub fn apply_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewNotification { mut notification } => {
                if let Some(existing) = self.entries.get(&notification.id) {
                    notification.is_read = notification.is_read || existing.is_read;
                }
                self.entries.insert(notification.id.clone(), notification);
            }
            PushEvent::NotificationCountUpdate { unread_count } => {
                self.check_advisory_count(unread_count);
            }
        }
    }

    /// Poll the REST `unread-count` endpoint and cross-check it.
    ///
    /// Same advisory status as the push variant.
    pub fn cross_check_unread(&mut self) -> Result<()> {
        let server_count = self.api.unread_count()?;
        self.check_advisory_count(server_count);
        Ok(())
    }

    /// Compare a server-reported unread count against the derived one.
    ///
    /// The advisory value is never written into the cache. Used for both the
    /// push variant and the REST `unread-count` endpoint.
    pub fn check_advisory_count(&mut self, server_count: u64) {
        let local = self.unread_count() as u64;
        if server_count == local {
            self.divergence_streak = 0;
            return;
        }

        self.divergence_streak += 1;
        warn!(
            server_count,
            local,
            streak = self.divergence_streak,
            "advisory unread count diverges from derived count"
        );

        if self.divergence_streak >= self.divergence_threshold {
            debug!("divergence threshold reached, refreshing from REST");
            self.divergence_streak = 0;
            if let Err(e) = self.refresh() {
                // Stale is acceptable; an explicit refresh() can recover.
                warn!(error = %e, "automatic refresh after divergence failed");
            }
        }
    }

    // --- Mutations ---

    /// Mark one notification as read, optimistically.
    ///
    /// The flag flips immediately; the confirmation call follows. On
    /// failure the flag reverts and the error is surfaced. Unknown ids and
    /// already-read entries are no-ops.
    pub fn mark_read(&mut self, id: &NotificationId) -> Result<()> {
        match self.entries.get_mut(id) {
            Some(entry) if !entry.is_read => entry.is_read = true,
            _ => return Ok(()),
        }

        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.mark_read(id) {
            Ok(()) => Ok(()),
            Err(e) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    debug!(%id, "stale mark-read result discarded");
                    return Ok(());
                }
                if let Some(entry) = self.entries.get_mut(id) {
                    entry.is_read = false;
                }
                Err(e)
            }
        }
    }

    /// Mark every unread notification as read, optimistically.
    ///
    /// Snapshots the unread ids, flips them all, and issues a single
    /// confirmation. The endpoint is all-or-nothing: on failure every id in
    /// the snapshot reverts together.
    pub fn mark_all_read(&mut self) -> Result<()> {
        let snapshot: Vec<NotificationId> = self
            .entries
            .values()
            .filter(|n| !n.is_read)
            .map(|n| n.id.clone())
            .collect();

        if snapshot.is_empty() {
            return Ok(());
        }

        for id in &snapshot {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.is_read = true;
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        match self.api.mark_all_read() {
            Ok(()) => Ok(()),
            Err(e) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    debug!("stale mark-all-read result discarded");
                    return Ok(());
                }
                for id in &snapshot {
                    if let Some(entry) = self.entries.get_mut(id) {
                        entry.is_read = false;
                    }
                }
                Err(e)
            }
        }
    }

    /// Discard any in-flight confirmation results. Called at teardown.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    // --- Reads ---

    /// Derived unread count. Equals the number of `is_read == false`
    /// entries at every observable instant.
    pub fn unread_count(&self) -> usize {
        self.entries.values().filter(|n| !n.is_read).count()
    }

    /// All cached notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut items: Vec<Notification> = self.entries.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
