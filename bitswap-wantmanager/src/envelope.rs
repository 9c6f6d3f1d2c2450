//! The unit of work the decision engine hands to the block-send path.

use bytes::Bytes;
use cid::Cid;
use libp2p::PeerId;

/// A scheduled delivery of one block to one peer, produced by the
/// decision engine (not part of this core) and consumed by
/// [`crate::manager::WantManager::send_block`].
///
/// `sent_callback` fires exactly once, on every path through
/// `send_block` — success or network failure alike — so the decision
/// engine always learns the outcome.
pub struct BlockEnvelope {
    pub peer: PeerId,
    pub key: Cid,
    pub block: Bytes,
    pub sent_callback: Box<dyn FnOnce() + Send>,
}

impl BlockEnvelope {
    pub fn new(
        peer: PeerId,
        key: Cid,
        block: Bytes,
        sent_callback: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            peer,
            key,
            block,
            sent_callback: Box::new(sent_callback),
        }
    }
}
