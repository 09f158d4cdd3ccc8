//! Online-set tracking.
//!
//! Presence is only ever learned from the server. A roster snapshot replaces
//! the online set wholesale; a presence change patches one participant.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use gigchat_proto::{PresenceStatus, PresenceUpdate, UserId};

/// Last known state of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    /// Online or offline.
    pub status: PresenceStatus,
    /// Last time the participant was seen, if known.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Membership change caused by a roster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    /// Participants online now but not before.
    pub joined: Vec<UserId>,
    /// Participants online before but not now.
    pub left: Vec<UserId>,
}

impl RosterDiff {
    /// Whether the roster changed anything.
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Set of online participants plus per-participant entries.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    online: BTreeSet<UserId>,
    entries: HashMap<UserId, PresenceEntry>,
}

impl PresenceTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Participants currently online.
    pub fn online(&self) -> &BTreeSet<UserId> {
        &self.online
    }

    /// Whether `user` is online.
    pub fn is_online(&self, user: &UserId) -> bool {
        self.online.contains(user)
    }

    /// Last known entry for `user`.
    pub fn entry(&self, user: &UserId) -> Option<&PresenceEntry> {
        self.entries.get(user)
    }

    /// Replace the online set with a roster snapshot.
    ///
    /// Participants missing from the snapshot are marked offline; their last
    /// seen time is kept.
    pub fn replace_roster(&mut self, roster: impl IntoIterator<Item = UserId>) -> RosterDiff {
        let next: BTreeSet<UserId> = roster.into_iter().collect();

        let left: Vec<UserId> = self.online.difference(&next).cloned().collect();
        let joined: Vec<UserId> = next.difference(&self.online).cloned().collect();

        for user in &left {
            if let Some(entry) = self.entries.get_mut(user) {
                entry.status = PresenceStatus::Offline;
            }
        }
        for user in &next {
            self.entries
                .entry(user.clone())
                .and_modify(|e| e.status = PresenceStatus::Online)
                .or_insert(PresenceEntry { status: PresenceStatus::Online, last_seen: None });
        }

        self.online = next;
        RosterDiff { joined, left }
    }

    /// Upsert one participant. Returns `true` if the online set changed.
    ///
    /// A missing `last_seen` keeps the previously known value.
    pub fn apply(&mut self, update: &PresenceUpdate) -> bool {
        let entry = self
            .entries
            .entry(update.user_id.clone())
            .or_insert(PresenceEntry { status: update.status, last_seen: None });
        entry.status = update.status;
        if update.last_seen.is_some() {
            entry.last_seen = update.last_seen;
        }

        match update.status {
            PresenceStatus::Online => self.online.insert(update.user_id.clone()),
            PresenceStatus::Offline => self.online.remove(&update.user_id),
        }
    }
}
