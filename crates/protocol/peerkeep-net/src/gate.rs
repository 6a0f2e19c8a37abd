//! Block list and a reference connection gate.
//!
//! Stacks that already have a connection manager implement
//! [`ConnectionGate`] on top of it. [`DefaultConnectionGate`] is for stacks
//! that don't: it keeps a block list with expiry and counts open
//! connections against a fixed ceiling.

use crate::traits::ConnectionGate;
use libp2p::PeerId;
use parking_lot::Mutex;
use peerkeep_types::DEFAULT_MAX_CONNECTIONS;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Peers that must not be dialed until their block expires.
#[derive(Debug, Default)]
pub struct BlockList {
    entries: HashMap<PeerId, Instant>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `peer` for `duration` from now. An existing block is replaced.
    pub fn block(&mut self, peer: PeerId, duration: Duration) {
        self.entries.insert(peer, Instant::now() + duration);
    }

    /// Returns true if `peer` is blocked. Expired blocks are removed.
    pub fn is_blocked(&mut self, peer: &PeerId) -> bool {
        let expired = match self.entries.get(peer) {
            Some(expiry) => *expiry <= Instant::now(),
            None => return false,
        };

        if expired {
            self.entries.remove(peer);
            debug!(peer = %peer, "Block expired");
        }
        !expired
    }

    /// Time left on the block, if any.
    pub fn remaining(&self, peer: &PeerId) -> Option<Duration> {
        self.entries
            .get(peer)
            .and_then(|expiry| expiry.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    /// Lift a block early. Returns true if the peer was blocked.
    pub fn unblock(&mut self, peer: &PeerId) -> bool {
        self.entries.remove(peer).is_some()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, expiry| *expiry > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Connection gate with a block list and a global connection ceiling.
#[derive(Debug)]
pub struct DefaultConnectionGate {
    blocklist: Mutex<BlockList>,
    max_connections: usize,
    open_connections: AtomicUsize,
}

impl Default for DefaultConnectionGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

impl DefaultConnectionGate {
    pub fn new(max_connections: usize) -> Self {
        Self {
            blocklist: Mutex::new(BlockList::new()),
            max_connections,
            open_connections: AtomicUsize::new(0),
        }
    }

    /// Number of connections currently counted as open.
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Number of peers currently blocked.
    pub fn blocked_count(&self) -> usize {
        let mut blocklist = self.blocklist.lock();
        blocklist.purge_expired();
        blocklist.len()
    }

    /// Lift a block early.
    pub fn unblock_peer(&self, peer: &PeerId) -> bool {
        self.blocklist.lock().unblock(peer)
    }
}

impl ConnectionGate for DefaultConnectionGate {
    fn is_peer_blocked(&self, peer: &PeerId) -> bool {
        self.blocklist.lock().is_blocked(peer)
    }

    fn block_peer(&self, peer: PeerId, duration: Duration) {
        debug!(peer = %peer, block_ms = duration.as_millis() as u64, "Blocking peer");
        self.blocklist.lock().block(peer, duration);
    }

    fn can_accept_new_connection(&self) -> bool {
        self.open_connections() < self.max_connections
    }

    fn connection_opened(&self, _peer: &PeerId) {
        self.open_connections.fetch_add(1, Ordering::SeqCst);
    }

    fn connection_closed(&self, _peer: &PeerId) {
        let _ = self
            .open_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_block_expires() {
        let mut blocklist = BlockList::new();
        let peer = PeerId::random();

        blocklist.block(peer, Duration::from_secs(60));
        assert!(blocklist.is_blocked(&peer));
        assert_eq!(blocklist.remaining(&peer), Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(blocklist.is_blocked(&peer));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!blocklist.is_blocked(&peer));
        assert!(blocklist.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let mut blocklist = BlockList::new();
        blocklist.block(PeerId::random(), Duration::from_secs(1));
        blocklist.block(PeerId::random(), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(5)).await;
        blocklist.purge_expired();

        assert_eq!(blocklist.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_peer_not_blocked() {
        let mut blocklist = BlockList::new();
        assert!(!blocklist.is_blocked(&PeerId::random()));
    }

    #[tokio::test]
    async fn test_gate_connection_ceiling() {
        let gate = DefaultConnectionGate::new(2);
        let peer = PeerId::random();

        assert!(gate.can_accept_new_connection());
        gate.connection_opened(&peer);
        gate.connection_opened(&peer);
        assert!(!gate.can_accept_new_connection());

        gate.connection_closed(&peer);
        assert!(gate.can_accept_new_connection());
        assert_eq!(gate.open_connections(), 1);
    }

    #[tokio::test]
    async fn test_gate_close_never_underflows() {
        let gate = DefaultConnectionGate::new(1);
        gate.connection_closed(&PeerId::random());
        assert_eq!(gate.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_gate_block_and_unblock() {
        let gate = DefaultConnectionGate::default();
        let peer = PeerId::random();

        gate.block_peer(peer, Duration::from_secs(60));
        assert!(gate.is_peer_blocked(&peer));
        assert_eq!(gate.blocked_count(), 1);

        assert!(gate.unblock_peer(&peer));
        assert!(!gate.is_peer_blocked(&peer));
    }
}
