//! Tuning knobs for the want-manager core.

use std::time::Duration;

/// Priority ceiling assigned to the first key in a `want_blocks`/
/// `cancel_wants` batch. Subsequent keys in the same batch get
/// `K_MAX - 1`, `K_MAX - 2`, and so on.
pub const K_MAX: i32 = i32::MAX;

/// Default period between full-wantlist rebroadcasts.
pub const DEFAULT_REBROADCAST_INTERVAL: Duration = Duration::from_secs(30);

/// Capacity of the `want_blocks`/`cancel_wants`/`connected`/`disconnected`
/// submission channels. Callers suspend once a channel is full.
pub const EVENT_CHANNEL_CAPACITY: usize = 10;
