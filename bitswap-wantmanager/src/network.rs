//! The network collaborator consumed by this core.
//!
//! The transport — opening streams, serializing messages, delivering
//! inbound messages — lives outside this crate. The core only ever
//! calls `connect` and `send`; both are required to be safe for
//! concurrent calls, since every per-peer sender task and the
//! `send_block` path share one `Network` instance.

use crate::message::Message;
use async_trait::async_trait;
use bitswap_interface::Result;
use libp2p::PeerId;

/// Transport operations the want-manager core depends on.
#[async_trait]
pub trait Network: Send + Sync {
    /// Ensure a stream to `peer` is open, opening one if necessary.
    async fn connect(&self, peer: &PeerId) -> Result<()>;

    /// Send `message` to `peer` over an already-open stream.
    async fn send(&self, peer: &PeerId, message: Message) -> Result<()>;
}

/// A `Network` test double recording every call it observes. Gated
/// behind `test-util` so integration tests in other crates can exercise
/// the want-manager without standing up a real transport.
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{mpsc, Mutex};

    /// Records every `connect`/`send` call it observes, and can be told
    /// to fail either operation for a given peer — used to exercise the
    /// sender task's retry-on-next-signal behavior and `send_block`'s
    /// error propagation.
    pub struct MockNetwork {
        sent: mpsc::UnboundedSender<(PeerId, Message)>,
        pub received: Mutex<mpsc::UnboundedReceiver<(PeerId, Message)>>,
        fail_connect: StdMutex<std::collections::HashSet<PeerId>>,
        fail_send: StdMutex<std::collections::HashSet<PeerId>>,
    }

    impl MockNetwork {
        pub fn new() -> Self {
            let (sent, received) = mpsc::unbounded_channel();
            Self {
                sent,
                received: Mutex::new(received),
                fail_connect: StdMutex::new(Default::default()),
                fail_send: StdMutex::new(Default::default()),
            }
        }

        pub fn fail_connect_for(&self, peer: PeerId) {
            self.fail_connect.lock().unwrap().insert(peer);
        }

        pub fn allow_connect_for(&self, peer: PeerId) {
            self.fail_connect.lock().unwrap().remove(&peer);
        }

        pub fn fail_send_for(&self, peer: PeerId) {
            self.fail_send.lock().unwrap().insert(peer);
        }

        pub async fn recv(&self) -> Option<(PeerId, Message)> {
            self.received.lock().await.recv().await
        }
    }

    #[async_trait]
    impl Network for MockNetwork {
        async fn connect(&self, peer: &PeerId) -> Result<()> {
            if self.fail_connect.lock().unwrap().contains(peer) {
                return Err(bitswap_interface::CoreError::network("mock connect failure"));
            }
            Ok(())
        }

        async fn send(&self, peer: &PeerId, message: Message) -> Result<()> {
            if self.fail_send.lock().unwrap().contains(peer) {
                return Err(bitswap_interface::CoreError::network("mock send failure"));
            }
            let _ = self.sent.send((*peer, message));
            Ok(())
        }
    }
}
