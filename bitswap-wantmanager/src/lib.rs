//! The want-manager core of a block-exchange protocol: the authoritative
//! wantlist, per-peer outbound coalescing queues, and the single-writer
//! event loop that ties them together.
//!
//! The transport (opening streams, wire encoding, inbound message
//! delivery) and the decision engine (choosing which peer to serve and
//! producing block envelopes) are external collaborators; this crate
//! only defines the [`network::Network`] trait the former must implement
//! and the [`envelope::BlockEnvelope`] type the latter hands in.

pub mod constants;
pub mod envelope;
pub mod manager;
pub mod message;
pub mod network;
pub mod queue;
pub mod wantlist;

pub use constants::{DEFAULT_REBROADCAST_INTERVAL, EVENT_CHANNEL_CAPACITY, K_MAX};
pub use envelope::BlockEnvelope;
pub use manager::{WantManager, WantManagerConfig};
pub use message::{Entry, Message};
pub use network::Network;
pub use wantlist::Wantlist;

pub type Result<T> = bitswap_interface::Result<T>;
