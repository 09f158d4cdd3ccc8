//! User-scoped notification feed.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use gigchat_proto::{NotificationId, NotificationPayload};

/// Feed entries kept before the oldest are dropped.
pub const DEFAULT_FEED_CAPACITY: usize = 100;

/// A notification held in local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Server-assigned id.
    pub id: NotificationId,
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Seen by the user.
    pub read: bool,
}

impl From<NotificationPayload> for Notification {
    fn from(payload: NotificationPayload) -> Self {
        Self {
            id: payload.id,
            title: payload.title,
            body: payload.body,
            created_at: payload.created_at,
            read: false,
        }
    }
}

/// Bounded newest-first notification list.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl NotificationFeed {
    /// Feed holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { items: VecDeque::with_capacity(capacity), capacity }
    }

    /// Add a notification. Returns `false` for an id already in the feed.
    pub fn push(&mut self, payload: NotificationPayload) -> bool {
        if self.items.iter().any(|n| n.id == payload.id) {
            return false;
        }
        self.items.push_front(Notification::from(payload));
        self.items.truncate(self.capacity);
        true
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries not yet marked read.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Mark every entry read.
    pub fn mark_all_read(&mut self) {
        self.items.iter_mut().for_each(|n| n.read = true);
    }
}
