//! The authoritative set of blocks this node currently wants.
//!
//! A [`Wantlist`] is a plain data structure with no synchronization of
//! its own — it is owned and mutated exclusively by the want-manager
//! loop (see [`crate::manager::WantManager`]). Externalizing that
//! discipline rather than building a mutex in keeps the common path
//! allocation-free and keeps the loop's ordering guarantees obvious.

use cid::Cid;
use std::collections::HashMap;

/// Mapping from a wanted key to the priority it was last asserted with.
///
/// Invariants:
/// - each key appears at most once ([`Wantlist::add`] replaces, never
///   duplicates);
/// - the stored priority is whatever was supplied by the most recent
///   non-cancel submission for that key (last-writer-wins).
#[derive(Debug, Clone, Default)]
pub struct Wantlist {
    entries: HashMap<Cid, i32>,
}

impl Wantlist {
    /// Create an empty wantlist.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert `key`, or replace its priority if already present.
    ///
    /// Postcondition: `self.lookup(key) == Some(priority)`.
    pub fn add(&mut self, key: Cid, priority: i32) {
        self.entries.insert(key, priority);
    }

    /// Remove `key`. A no-op if the key isn't present.
    pub fn remove(&mut self, key: &Cid) {
        self.entries.remove(key);
    }

    /// Look up the priority currently recorded for `key`, if any.
    pub fn lookup(&self, key: &Cid) -> Option<i32> {
        self.entries.get(key).copied()
    }

    /// True if `key` is currently wanted.
    pub fn contains(&self, key: &Cid) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys currently wanted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the wantlist holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A stable snapshot of the current wants. Order is unspecified but
    /// deterministic within a single call.
    pub fn entries(&self) -> Vec<(Cid, i32)> {
        self.entries.iter().map(|(k, v)| (*k, *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multihash::Multihash;

    fn key(n: u64) -> Cid {
        let mh = Multihash::wrap(0, &n.to_be_bytes()).unwrap();
        Cid::new_v1(0x55, mh)
    }

    #[test]
    fn add_then_lookup_returns_the_supplied_priority() {
        let mut wl = Wantlist::new();
        wl.add(key(1), 7);
        assert_eq!(wl.lookup(&key(1)), Some(7));
    }

    #[test]
    fn add_twice_is_last_writer_wins() {
        let mut wl = Wantlist::new();
        wl.add(key(1), 7);
        wl.add(key(1), 3);
        assert_eq!(wl.lookup(&key(1)), Some(3));
        assert_eq!(wl.len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut wl = Wantlist::new();
        wl.remove(&key(1));
        assert!(!wl.contains(&key(1)));

        wl.add(key(1), 1);
        wl.remove(&key(1));
        wl.remove(&key(1));
        assert!(!wl.contains(&key(1)));
    }

    #[test]
    fn entries_snapshot_reflects_current_state() {
        let mut wl = Wantlist::new();
        wl.add(key(1), 1);
        wl.add(key(2), 2);
        wl.remove(&key(1));

        let snapshot = wl.entries();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0], (key(2), 2));
    }
}
