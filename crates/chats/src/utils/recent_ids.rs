//! Bounded window of recently seen message ids.

use std::collections::{HashSet, VecDeque};

use crate::types::MessageId;

/// Remembers the last `capacity` message ids seen for one chat so that
/// at-least-once redelivery can be recognised without keeping full history.
#[derive(Debug, Clone)]
pub struct RecentIds {
    order: VecDeque<MessageId>,
    members: HashSet<MessageId>,
    capacity: usize,
}

impl RecentIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(64)),
            members: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Record `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<MessageId>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }

        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }

        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_repeated_ids() {
        let mut recent = RecentIds::new(4);
        assert!(recent.insert("a"));
        assert!(!recent.insert("a"));
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut recent = RecentIds::new(2);
        recent.insert("a");
        recent.insert("b");
        recent.insert("c");

        assert!(!recent.contains("a"));
        assert!(recent.contains("b"));
        assert!(recent.contains("c"));
        assert_eq!(recent.len(), 2);
    }
}
