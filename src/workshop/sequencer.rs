use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Identifies one issued request for a logical target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    key: String,
    sequence: u64,
}

impl RequestTicket {
    /// Target this ticket was issued for
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Issue order across all targets, starting at 1
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Monotonic request numbering with a newest-ticket slot per key.
///
/// Every request for a target takes a ticket before it suspends; when its
/// result arrives it is applied only if no newer ticket was issued for the
/// same key in the meantime. Sequence numbers are shared by all keys, so a
/// slot can be released once its newest request finishes without an older
/// ticket ever matching again.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl RequestSequencer {
    /// Create an empty sequencer
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ticket for `key`
    pub fn begin(&self, key: impl Into<String>) -> RequestTicket {
        let key = key.into();
        let sequence = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), sequence);
        RequestTicket { key, sequence }
    }

    /// Whether `ticket` is still the newest for its key
    pub fn is_latest(&self, ticket: &RequestTicket) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&ticket.key)
            .is_some_and(|latest| *latest == ticket.sequence)
    }

    /// Release the key's slot if `ticket` is still its newest request.
    pub fn finish(&self, ticket: &RequestTicket) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if latest.get(&ticket.key) == Some(&ticket.sequence) {
            latest.remove(&ticket.key);
        }
    }

    /// Number of keys with an outstanding newest request
    pub fn pending(&self) -> usize {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let sequencer = RequestSequencer::new();
        let first = sequencer.begin("analysis:a");
        assert!(sequencer.is_latest(&first));

        let second = sequencer.begin("analysis:a");
        assert!(!sequencer.is_latest(&first));
        assert!(sequencer.is_latest(&second));
        assert!(second.sequence() > first.sequence());
    }

    #[test]
    fn test_keys_are_independent() {
        let sequencer = RequestSequencer::new();
        let a = sequencer.begin("analysis:a");
        let b = sequencer.begin("analysis:b");
        assert!(sequencer.is_latest(&a));
        assert!(sequencer.is_latest(&b));
        assert_eq!(b.key(), "analysis:b");
    }

    #[test]
    fn test_finish_releases_slot_without_reviving_old_tickets() {
        let sequencer = RequestSequencer::new();
        let stale = sequencer.begin("analysis:a");
        let newest = sequencer.begin("analysis:a");

        // a superseded ticket finishing leaves the slot alone
        sequencer.finish(&stale);
        assert_eq!(sequencer.pending(), 1);
        assert!(sequencer.is_latest(&newest));

        sequencer.finish(&newest);
        assert_eq!(sequencer.pending(), 0);
        assert!(!sequencer.is_latest(&stale));

        let next = sequencer.begin("analysis:a");
        assert!(!sequencer.is_latest(&stale));
        assert!(sequencer.is_latest(&next));
        assert!(next.sequence() > newest.sequence());
    }
}
