//! Mock implementation of the `ConnectionGate` trait for testing.
//!
//! Blocks never expire on their own; tests lift them explicitly.

use libp2p::PeerId;
use peerkeep_net::ConnectionGate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Default)]
struct MockGateInner {
    /// Currently blocked peers and the duration they were blocked for.
    blocked: HashMap<PeerId, Duration>,
    /// Every block request, in order.
    block_requests: Vec<(PeerId, Duration)>,
    /// When false, `can_accept_new_connection` refuses.
    has_capacity: bool,
    /// Balance of `connection_opened` and `connection_closed` calls.
    open_connections: i64,
}

/// A mock implementation of the `ConnectionGate` trait for testing.
///
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and all
/// clones share the same state.
#[derive(Clone)]
pub struct MockConnectionGate {
    inner: Arc<RwLock<MockGateInner>>,
}

impl Default for MockConnectionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnectionGate {
    /// Create a gate with capacity and an empty block list.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockGateInner {
                has_capacity: true,
                ..Default::default()
            })),
        }
    }

    /// Start with `peer` blocked.
    pub fn with_blocked_peer(self, peer: PeerId) -> Self {
        self.inner
            .write()
            .unwrap()
            .blocked
            .insert(peer, Duration::MAX);
        self
    }

    /// Start without capacity for new connections.
    pub fn without_capacity(self) -> Self {
        self.set_capacity(false);
        self
    }

    pub fn set_capacity(&self, has_capacity: bool) {
        self.inner.write().unwrap().has_capacity = has_capacity;
    }

    /// Lift a block. Returns true if the peer was blocked.
    pub fn unblock(&self, peer: &PeerId) -> bool {
        self.inner.write().unwrap().blocked.remove(peer).is_some()
    }

    /// Every `block_peer` call so far.
    pub fn block_requests(&self) -> Vec<(PeerId, Duration)> {
        self.inner.read().unwrap().block_requests.clone()
    }

    pub fn open_connections(&self) -> i64 {
        self.inner.read().unwrap().open_connections
    }
}

impl ConnectionGate for MockConnectionGate {
    fn is_peer_blocked(&self, peer: &PeerId) -> bool {
        self.inner.read().unwrap().blocked.contains_key(peer)
    }

    fn block_peer(&self, peer: PeerId, duration: Duration) {
        let mut inner = self.inner.write().unwrap();
        inner.blocked.insert(peer, duration);
        inner.block_requests.push((peer, duration));
    }

    fn can_accept_new_connection(&self) -> bool {
        self.inner.read().unwrap().has_capacity
    }

    fn connection_opened(&self, _peer: &PeerId) {
        self.inner.write().unwrap().open_connections += 1;
    }

    fn connection_closed(&self, _peer: &PeerId) {
        self.inner.write().unwrap().open_connections -= 1;
    }
}
