//! The single-writer coordinator: owns the authoritative wantlist and
//! the peer map, and is the only task allowed to touch either.
//!
//! Every external operation is a thin, non-blocking submission onto a
//! channel the loop task owns; the loop itself is the only place where
//! [`Wantlist`] and the peer→[`MessageQueue`] map are read or mutated.
//! `send_block` is the one exception: it bypasses the loop entirely and
//! talks to the network directly, because it must block for backpressure
//! and must not be subject to the wantlist queue's coalescing/drop
//! behavior.

use crate::constants::{DEFAULT_REBROADCAST_INTERVAL, EVENT_CHANNEL_CAPACITY, K_MAX};
use crate::envelope::BlockEnvelope;
use crate::message::{Entry, Message};
use crate::network::Network;
use crate::queue::MessageQueue;
use crate::wantlist::Wantlist;
use cid::Cid;
use libp2p::PeerId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Tuning knobs for a [`WantManager`] instance.
#[derive(Debug, Clone)]
pub struct WantManagerConfig {
    /// Priority assigned to the first key of a `want_blocks`/`cancel_wants`
    /// batch; subsequent keys count down from it.
    pub k_max: i32,
    /// Period between full-wantlist rebroadcasts.
    pub rebroadcast_interval: Duration,
    /// Capacity of the submission channels (`want_blocks`, `cancel_wants`,
    /// `connected`, `disconnected`).
    pub event_channel_capacity: usize,
}

impl Default for WantManagerConfig {
    fn default() -> Self {
        Self {
            k_max: K_MAX,
            rebroadcast_interval: DEFAULT_REBROADCAST_INTERVAL,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// One batch of local want/cancel submissions, already turned into
/// positionally-prioritized entries by the submitting method.
type Batch = Vec<Entry>;

/// Handle used by application and decision-engine code to drive a
/// running [`WantManager`]. Cloning is cheap; every clone submits to the
/// same loop task.
#[derive(Clone)]
pub struct WantManager {
    incoming_tx: mpsc::Sender<Batch>,
    connect_tx: mpsc::Sender<PeerId>,
    disconnect_tx: mpsc::Sender<PeerId>,
    network: Arc<dyn Network>,
    cancel: CancellationToken,
    k_max: i32,
}

/// Assign priorities positionally: the first key gets `k_max`, the
/// second `k_max - 1`, and so on. Saturating so a batch longer than
/// `k_max` entries degrades to very negative priorities rather than
/// overflowing.
fn positional_entries(keys: Vec<Cid>, k_max: i32, cancel: bool) -> Batch {
    keys.into_iter()
        .enumerate()
        .map(|(i, key)| {
            let priority = k_max.saturating_sub(i as i32);
            Entry {
                key,
                priority,
                cancel,
            }
        })
        .collect()
}

/// Build a full-snapshot entry list from the wantlist. `Wantlist::entries`
/// returns a `HashMap`-order snapshot — unspecified per spec §4.1 — so this
/// sorts it into a deterministic order (highest priority first, ties broken
/// by key) rather than handing peers a snapshot whose entry order varies
/// from one process run to the next.
fn full_snapshot(wantlist: &Wantlist) -> Vec<Entry> {
    let mut entries: Vec<Entry> = wantlist
        .entries()
        .into_iter()
        .map(|(key, priority)| Entry::want(key, priority))
        .collect();
    entries.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.key.to_bytes().cmp(&b.key.to_bytes()))
    });
    entries
}

/// The four event sources the manager loop selects over, besides shutdown.
enum LoopEvent {
    Batch(Option<Batch>),
    Tick,
    Connect(Option<PeerId>),
    Disconnect(Option<PeerId>),
}

impl WantManager {
    /// Build a manager together with the future that runs its event loop
    /// (`run`, in the spec's terms). The caller is responsible for
    /// driving the returned future, usually via `tokio::spawn`; the loop
    /// owns a cancellation token of its own rather than taking one from
    /// the caller (see `DESIGN.md`), so shutdown goes through
    /// [`WantManager::shutdown`] instead of dropping an external context.
    pub fn new(
        network: Arc<dyn Network>,
        config: WantManagerConfig,
    ) -> (Self, impl std::future::Future<Output = ()>) {
        let (incoming_tx, incoming_rx) = mpsc::channel(config.event_channel_capacity);
        let (connect_tx, connect_rx) = mpsc::channel(config.event_channel_capacity);
        let (disconnect_tx, disconnect_rx) = mpsc::channel(config.event_channel_capacity);
        let cancel = CancellationToken::new();

        let manager = WantManager {
            incoming_tx,
            connect_tx,
            disconnect_tx,
            network: network.clone(),
            cancel: cancel.clone(),
            k_max: config.k_max,
        };

        let loop_fut = run_loop(
            network,
            config.rebroadcast_interval,
            incoming_rx,
            connect_rx,
            disconnect_rx,
            cancel,
        );

        (manager, loop_fut)
    }

    /// Record interest in `keys`. Priorities are assigned positionally:
    /// the first key gets `K_MAX`, the second `K_MAX - 1`, and so on. A
    /// submission of zero keys is a no-op.
    pub async fn want_blocks(&self, keys: Vec<Cid>) {
        if keys.is_empty() {
            return;
        }
        let batch = positional_entries(keys, self.k_max, false);
        self.submit(batch).await;
    }

    /// Withdraw interest in `keys`. A submission of zero keys is a no-op.
    pub async fn cancel_wants(&self, keys: Vec<Cid>) {
        if keys.is_empty() {
            return;
        }
        let batch = positional_entries(keys, self.k_max, true);
        self.submit(batch).await;
    }

    async fn submit(&self, batch: Batch) {
        tokio::select! {
            _ = self.incoming_tx.send(batch) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Notify the manager that `peer` is now reachable.
    pub async fn connected(&self, peer: PeerId) {
        tokio::select! {
            _ = self.connect_tx.send(peer) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Notify the manager that `peer` is gone.
    pub async fn disconnected(&self, peer: PeerId) {
        tokio::select! {
            _ = self.disconnect_tx.send(peer) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    /// Synchronously deliver one block to one peer, bypassing the
    /// per-peer wantlist queue entirely. `envelope.sent_callback` fires
    /// exactly once, whether the send succeeds or fails.
    pub async fn send_block(&self, envelope: BlockEnvelope) {
        let BlockEnvelope {
            peer,
            key,
            block,
            sent_callback,
        } = envelope;

        let message = Message::with_block(key, block);
        if let Err(err) = self.network.send(&peer, message).await {
            warn!(%peer, error = %err, "bitswap: block send failed");
        }
        sent_callback();
    }

    /// A token that fires when the manager's loop has been asked to
    /// shut down. Submission methods select on it so callers never block
    /// forever against a manager that is no longer running.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the loop to terminate. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// The event loop: the only task ever allowed to touch `wantlist` or
/// `peers`. Everything else communicates through the channels it selects
/// on.
async fn run_loop(
    network: Arc<dyn Network>,
    rebroadcast_interval: Duration,
    mut incoming_rx: mpsc::Receiver<Batch>,
    mut connect_rx: mpsc::Receiver<PeerId>,
    mut disconnect_rx: mpsc::Receiver<PeerId>,
    cancel: CancellationToken,
) {
    let mut wantlist = Wantlist::new();
    let mut peers: HashMap<PeerId, MessageQueue> = HashMap::new();
    let mut ticker = tokio::time::interval(rebroadcast_interval);
    // The first tick fires immediately; skip it so rebroadcast behaves as
    // "every interval", not "immediately, then every interval".
    ticker.tick().await;

    loop {
        // Shutdown is the only arm that gets strict priority: `biased`
        // here only orders this two-armed select, so a pending cancellation
        // is never starved by a busy event source. The four event sources
        // themselves are raced without bias in the inner select below, per
        // spec §5 ("the manager loop linearizes whichever event channel
        // presents first").
        let event = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("bitswap: want-manager loop shutting down");
                return;
            }

            event = async {
                tokio::select! {
                    batch = incoming_rx.recv() => LoopEvent::Batch(batch),
                    _ = ticker.tick() => LoopEvent::Tick,
                    peer = connect_rx.recv() => LoopEvent::Connect(peer),
                    peer = disconnect_rx.recv() => LoopEvent::Disconnect(peer),
                }
            } => event,
        };

        match event {
            LoopEvent::Batch(batch) => {
                let Some(batch) = batch else { return };
                for entry in &batch {
                    if entry.cancel {
                        wantlist.remove(&entry.key);
                    } else {
                        wantlist.add(entry.key, entry.priority);
                    }
                }
                for queue in peers.values() {
                    queue.enqueue(&batch).await;
                }
            }

            LoopEvent::Tick => {
                let snapshot = full_snapshot(&wantlist);
                for queue in peers.values() {
                    queue.replace_with_full(snapshot.clone()).await;
                }
            }

            LoopEvent::Connect(peer) => {
                let Some(peer) = peer else { return };
                if peers.contains_key(&peer) {
                    debug!(%peer, "bitswap: ignoring connect for already-tracked peer");
                    continue;
                }
                let snapshot = full_snapshot(&wantlist);
                let queue = MessageQueue::spawn(
                    peer,
                    network.clone(),
                    Message::full(snapshot),
                    cancel.clone(),
                );
                peers.insert(peer, queue);
            }

            LoopEvent::Disconnect(peer) => {
                let Some(peer) = peer else { return };
                if let Some(queue) = peers.remove(&peer) {
                    queue.close().await;
                }
            }
        }
    }
}
