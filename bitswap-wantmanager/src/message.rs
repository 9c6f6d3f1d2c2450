//! The protocol message types the core mints: wantlist deltas/snapshots
//! and single-block deliveries. The wire encoding of these is owned by
//! the protocol layer, not reinvented here — this module only models
//! the shape the core needs to build and merge messages.

use bytes::Bytes;
use cid::Cid;

/// A single wantlist change, either as an element of a wantlist snapshot
/// or as a delta carried in a [`Message`].
///
/// `priority` is a non-negative integer; higher means more urgent. When
/// `cancel` is `true` the priority is meaningless — it is still
/// populated (by the same positional formula used for non-cancel
/// entries) because callers build cancel and non-cancel entries through
/// the same code path, but receivers must ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: Cid,
    pub priority: i32,
    pub cancel: bool,
}

impl Entry {
    pub fn want(key: Cid, priority: i32) -> Self {
        Self {
            key,
            priority,
            cancel: false,
        }
    }

    pub fn cancel(key: Cid, priority: i32) -> Self {
        Self {
            key,
            priority,
            cancel: true,
        }
    }
}

/// An outbound protocol message.
///
/// `full = true` means "this is my entire wantlist; replace whatever
/// you thought I wanted with exactly this set" — a full message never
/// contains cancel entries, since there is nothing to cancel against a
/// wholesale replacement. `full = false` means "these are deltas; apply
/// on top of your prior view."
///
/// A message may carry a block in addition to (or instead of) entries;
/// the core only ever mints entry-carrying messages for wantlist
/// traffic, and single-block messages (no entries) for block delivery.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub full: bool,
    pub entries: Vec<Entry>,
    pub block: Option<(Cid, Bytes)>,
}

impl Message {
    /// An empty, non-full message — the starting point for coalescing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A full snapshot message containing exactly `entries`.
    pub fn full(entries: Vec<Entry>) -> Self {
        debug_assert!(
            entries.iter().all(|e| !e.cancel),
            "a full message must not contain cancel entries"
        );
        Self {
            full: true,
            entries,
            block: None,
        }
    }

    /// A message carrying a single block, for the block-send path.
    pub fn with_block(key: Cid, data: Bytes) -> Self {
        Self {
            full: false,
            entries: Vec::new(),
            block: Some((key, data)),
        }
    }

    /// True when neither entries nor a block are present. Empty
    /// messages must never be sent.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.block.is_none()
    }

    /// Merge `entry` into this message's entries: a cancel removes any
    /// prior add for the key and records the cancel; a non-cancel want
    /// removes any prior cancel for the key and records the add with
    /// the given priority. Either way the key appears at most once.
    ///
    /// A `full` message is a wholesale replacement, so absence already
    /// conveys "not wanted" — per invariant M1, a cancel merged into a
    /// full message only removes the key's prior entry and never
    /// appends a cancel entry of its own.
    pub fn merge_entry(&mut self, entry: Entry) {
        self.entries.retain(|e| e.key != entry.key);
        if !(self.full && entry.cancel) {
            self.entries.push(entry);
        }
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
    fn empty_message_has_no_entries_and_no_block() {
        assert!(Message::empty().is_empty());
    }

    #[test]
    fn merge_entry_replaces_an_add_with_a_later_cancel() {
        let mut msg = Message::empty();
        msg.merge_entry(Entry::want(key(1), 5));
        msg.merge_entry(Entry::cancel(key(1), 0));

        assert_eq!(msg.entries.len(), 1);
        assert!(msg.entries[0].cancel);
    }

    #[test]
    fn merge_entry_replaces_a_cancel_with_a_later_add() {
        let mut msg = Message::empty();
        msg.merge_entry(Entry::cancel(key(1), 0));
        msg.merge_entry(Entry::want(key(1), 9));

        assert_eq!(msg.entries.len(), 1);
        assert!(!msg.entries[0].cancel);
        assert_eq!(msg.entries[0].priority, 9);
    }

    #[test]
    fn message_with_block_is_not_empty() {
        let msg = Message::with_block(key(1), Bytes::from_static(b"data"));
        assert!(!msg.is_empty());
        assert!(msg.entries.is_empty());
    }

    #[test]
    fn merging_a_cancel_into_a_full_message_drops_the_key_without_a_cancel_entry() {
        let mut msg = Message::full(vec![Entry::want(key(1), 5)]);
        msg.merge_entry(Entry::cancel(key(1), 0));

        assert!(msg.entries.is_empty(), "full message must stay free of cancel entries");
    }
}
