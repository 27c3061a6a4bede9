//! Online-user set maintained from snapshots and incremental updates.

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{PresenceUpdate, UserId};

/// A presence change as delivered by the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Snapshot(Vec<UserId>),
    Incremental(PresenceUpdate),
    WentOffline(UserId),
}

/// Tracks which users are online.
///
/// Snapshots and incremental updates are not ordered relative to each other.
/// An incremental update that arrives before any snapshot is taken as the
/// snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceTracker {
    online: BTreeSet<UserId>,
    has_snapshot: bool,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change; returns whether the online set changed.
    pub fn apply(&mut self, change: PresenceChange) -> bool {
        match change {
            PresenceChange::Snapshot(ids) => self.apply_snapshot(ids),
            PresenceChange::Incremental(update) => self.apply_incremental(update),
            PresenceChange::WentOffline(id) => self.mark_offline(&id),
        }
    }

    pub fn apply_snapshot(&mut self, ids: impl IntoIterator<Item = UserId>) -> bool {
        let next: BTreeSet<UserId> = ids.into_iter().collect();
        self.has_snapshot = true;
        if next == self.online {
            return false;
        }
        self.online = next;
        true
    }

    pub fn apply_incremental(&mut self, update: PresenceUpdate) -> bool {
        if !self.has_snapshot {
            debug!(
                online = update.online.len(),
                "incremental presence before first snapshot, treating as snapshot"
            );
            let offline: BTreeSet<&UserId> = update.offline.iter().collect();
            let ids: Vec<UserId> = update
                .online
                .iter()
                .filter(|id| !offline.contains(id))
                .cloned()
                .collect();
            return self.apply_snapshot(ids);
        }

        let mut changed = false;
        for id in update.online {
            changed |= self.online.insert(id);
        }
        for id in &update.offline {
            changed |= self.online.remove(id);
        }
        changed
    }

    pub fn mark_offline(&mut self, id: &str) -> bool {
        self.online.remove(id)
    }

    pub fn is_online(&self, id: &str) -> bool {
        self.online.contains(id)
    }

    pub fn online_users(&self) -> &BTreeSet<UserId> {
        &self.online
    }

    pub fn has_snapshot(&self) -> bool {
        self.has_snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tracker: &PresenceTracker) -> Vec<&str> {
        tracker.online_users().iter().map(String::as_str).collect()
    }

    #[test]
    fn snapshot_replaces_wholesale() {
        let mut tracker = PresenceTracker::new();
        tracker.apply_snapshot(vec!["a".to_string(), "b".to_string()]);
        tracker.apply_snapshot(vec!["c".to_string()]);
        assert_eq!(ids(&tracker), ["c"]);
    }

    #[test]
    fn incremental_before_snapshot_is_treated_as_snapshot() {
        let mut tracker = PresenceTracker::new();
        assert!(tracker.apply_incremental(PresenceUpdate {
            online: vec!["a".into(), "b".into()],
            offline: vec!["b".into()],
        }));
        assert!(tracker.has_snapshot());
        assert_eq!(ids(&tracker), ["a"]);
    }

    #[test]
    fn incremental_after_snapshot_unions_and_removes() {
        let mut tracker = PresenceTracker::new();
        tracker.apply_snapshot(vec!["a".to_string(), "b".to_string()]);
        tracker.apply_incremental(PresenceUpdate {
            online: vec!["c".into()],
            offline: vec!["a".into()],
        });
        assert_eq!(ids(&tracker), ["b", "c"]);
    }

    #[test]
    fn repeated_snapshot_reports_no_change() {
        let mut tracker = PresenceTracker::new();
        assert!(tracker.apply(PresenceChange::Snapshot(vec!["a".into()])));
        assert!(!tracker.apply(PresenceChange::Snapshot(vec!["a".into()])));
        assert!(tracker.apply(PresenceChange::WentOffline("a".into())));
        assert!(!tracker.is_online("a"));
    }
}
