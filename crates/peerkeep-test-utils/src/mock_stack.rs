//! Mock implementation of the `DiscoveryStack` trait for testing.
//!
//! Provides a configurable mock stack that records dials and DHT queries
//! and returns scripted outcomes.

use async_trait::async_trait;
use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};
use peerkeep_net::{
    ClosestPeer, DhtScope, DiscoveryError, DiscoveryResult, DiscoveryStack, StackEvent,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted outcome of a dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockDial {
    /// The connection is established.
    Succeed,
    /// `DialFailed`: the scheduler moves to the next address.
    Fail,
    /// `Timeout`: the scheduler moves to the next address.
    Timeout,
    /// `Internal`: aborts the whole dial.
    Unexpected(String),
    /// The stack panics inside `dial`.
    Panic,
}

struct MockStackInner {
    /// Local peer ID.
    local_peer_id: PeerId,
    /// Outcome when nothing more specific is scripted.
    default_dial: MockDial,
    /// Outcomes keyed by address (without the `/p2p/<id>` suffix).
    address_outcomes: HashMap<String, MockDial>,
    /// Outcomes keyed by target peer.
    peer_outcomes: HashMap<PeerId, MockDial>,
    /// Delay applied to every dial before it resolves.
    dial_delay: Option<Duration>,
    /// Closest-peer answers per instance; missing instances are unavailable.
    dht: HashMap<DhtScope, Result<Vec<ClosestPeer>, String>>,
    /// Recorded dial targets (spy pattern).
    dials: Vec<(PeerId, Multiaddr)>,
    /// Recorded DHT queries.
    dht_queries: Vec<(DhtScope, usize)>,
    /// Event queue for next_event().
    events: VecDeque<StackEvent>,
}

/// A mock implementation of the `DiscoveryStack` trait for testing.
///
/// Every dial succeeds unless scripted otherwise. Uses `Arc<Mutex<...>>`
/// internally, so it is cheap to clone and all clones share the same state.
#[derive(Clone)]
pub struct MockStack {
    inner: Arc<Mutex<MockStackInner>>,
}

impl Default for MockStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStack {
    /// Create a new MockStack with a random local peer ID.
    pub fn new() -> Self {
        Self::with_local_peer_id(PeerId::random())
    }

    /// Create a new MockStack with a specific local peer ID.
    pub fn with_local_peer_id(peer_id: PeerId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockStackInner {
                local_peer_id: peer_id,
                default_dial: MockDial::Succeed,
                address_outcomes: HashMap::new(),
                peer_outcomes: HashMap::new(),
                dial_delay: None,
                dht: HashMap::new(),
                dials: Vec::new(),
                dht_queries: Vec::new(),
                events: VecDeque::new(),
            })),
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Outcome for dials nothing more specific is scripted for.
    pub fn with_default_dial(self, outcome: MockDial) -> Self {
        self.inner.lock().unwrap().default_dial = outcome;
        self
    }

    /// Outcome for dials to `address`.
    pub fn with_address_outcome(self, address: &str, outcome: MockDial) -> Self {
        self.set_address_outcome(address, outcome);
        self
    }

    /// Outcome for every dial to `peer`.
    pub fn with_peer_outcome(self, peer: PeerId, outcome: MockDial) -> Self {
        self.set_peer_outcome(peer, outcome);
        self
    }

    /// Make every dial take `delay` before resolving.
    pub fn with_dial_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().dial_delay = Some(delay);
        self
    }

    /// Answer closest-peer queries on `scope` with `peers`.
    pub fn with_dht_peers(self, scope: DhtScope, peers: Vec<ClosestPeer>) -> Self {
        self.inner.lock().unwrap().dht.insert(scope, Ok(peers));
        self
    }

    /// Fail closest-peer queries on `scope`.
    pub fn with_dht_failure(self, scope: DhtScope, reason: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .dht
            .insert(scope, Err(reason.to_string()));
        self
    }

    // =========================================================================
    // Runtime Scripting
    // =========================================================================

    pub fn set_address_outcome(&self, address: &str, outcome: MockDial) {
        self.inner
            .lock()
            .unwrap()
            .address_outcomes
            .insert(address.to_string(), outcome);
    }

    pub fn set_peer_outcome(&self, peer: PeerId, outcome: MockDial) {
        self.inner.lock().unwrap().peer_outcomes.insert(peer, outcome);
    }

    pub fn set_default_dial(&self, outcome: MockDial) {
        self.inner.lock().unwrap().default_dial = outcome;
    }

    /// Drop every per-address and per-peer outcome.
    pub fn clear_outcomes(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.address_outcomes.clear();
        inner.peer_outcomes.clear();
    }

    /// Enqueue an event to be returned by `next_event`.
    pub fn enqueue_event(&self, event: StackEvent) {
        self.inner.lock().unwrap().events.push_back(event);
    }

    // =========================================================================
    // Spy Getters
    // =========================================================================

    /// All recorded dial targets, oldest first.
    pub fn dials(&self) -> Vec<(PeerId, Multiaddr)> {
        self.inner.lock().unwrap().dials.clone()
    }

    pub fn dial_count(&self) -> usize {
        self.inner.lock().unwrap().dials.len()
    }

    /// Number of dials to `peer`.
    pub fn dials_to(&self, peer: &PeerId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .dials
            .iter()
            .filter(|(p, _)| p == peer)
            .count()
    }

    pub fn dht_queries(&self) -> Vec<(DhtScope, usize)> {
        self.inner.lock().unwrap().dht_queries.clone()
    }

    pub fn clear_dials(&self) {
        self.inner.lock().unwrap().dials.clear();
    }
}

/// Split a dial target into the destination peer and the bare address.
fn split_target(target: &Multiaddr) -> (Option<PeerId>, String) {
    let mut address = target.clone();
    match address.pop() {
        Some(Protocol::P2p(peer)) => (Some(peer), address.to_string()),
        _ => (None, target.to_string()),
    }
}

#[async_trait]
impl DiscoveryStack for MockStack {
    fn local_peer_id(&self) -> PeerId {
        self.inner.lock().unwrap().local_peer_id
    }

    async fn dial(&self, target: Multiaddr) -> DiscoveryResult<()> {
        let (peer, address) = split_target(&target);

        let (outcome, delay) = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(peer) = peer {
                inner.dials.push((peer, target.clone()));
            }
            let outcome = inner
                .address_outcomes
                .get(&address)
                .or_else(|| peer.and_then(|p| inner.peer_outcomes.get(&p)))
                .cloned()
                .unwrap_or_else(|| inner.default_dial.clone());
            (outcome, inner.dial_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            MockDial::Succeed => Ok(()),
            MockDial::Fail => Err(DiscoveryError::DialFailed(format!(
                "connection refused: {}",
                address
            ))),
            MockDial::Timeout => Err(DiscoveryError::Timeout(address)),
            MockDial::Unexpected(message) => Err(DiscoveryError::Internal(message)),
            MockDial::Panic => panic!("mock stack panicked dialing {}", address),
        }
    }

    async fn find_closest_peers(
        &self,
        scope: DhtScope,
        _target: PeerId,
        count: usize,
    ) -> DiscoveryResult<Vec<ClosestPeer>> {
        let mut inner = self.inner.lock().unwrap();
        inner.dht_queries.push((scope, count));
        match inner.dht.get(&scope) {
            Some(Ok(peers)) => Ok(peers.iter().take(count).cloned().collect()),
            Some(Err(reason)) => Err(DiscoveryError::DhtQuery {
                scope,
                reason: reason.clone(),
            }),
            None => Err(DiscoveryError::DhtUnavailable(scope)),
        }
    }

    async fn next_event(&self) -> DiscoveryResult<StackEvent> {
        self.inner
            .lock()
            .unwrap()
            .events
            .pop_front()
            .ok_or(DiscoveryError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "/ip4/10.0.0.1/tcp/4001";

    fn target(peer: PeerId, address: &str) -> Multiaddr {
        format!("{}/p2p/{}", address, peer).parse().unwrap()
    }

    #[tokio::test]
    async fn test_dial_defaults_to_success() {
        let stack = MockStack::new();
        let peer = PeerId::random();

        assert!(stack.dial(target(peer, ADDR)).await.is_ok());
        assert_eq!(stack.dials_to(&peer), 1);
        assert_eq!(stack.dials()[0].1.to_string(), format!("{}/p2p/{}", ADDR, peer));
    }

    #[tokio::test]
    async fn test_address_outcome_beats_peer_outcome() {
        let peer = PeerId::random();
        let stack = MockStack::new()
            .with_peer_outcome(peer, MockDial::Timeout)
            .with_address_outcome(ADDR, MockDial::Fail);

        let err = stack.dial(target(peer, ADDR)).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::DialFailed(_)));

        let err = stack
            .dial(target(peer, "/ip4/10.0.0.2/tcp/4001"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_dht_scripting() {
        let peer = PeerId::random();
        let stack = MockStack::new()
            .with_dht_peers(DhtScope::Lan, vec![ClosestPeer::new(peer)])
            .with_dht_failure(DhtScope::Wan, "timed out");
        let local = stack.local_peer_id();

        let lan = stack.find_closest_peers(DhtScope::Lan, local, 5).await.unwrap();
        assert_eq!(lan, vec![ClosestPeer::new(peer)]);
        assert!(matches!(
            stack.find_closest_peers(DhtScope::Wan, local, 5).await,
            Err(DiscoveryError::DhtQuery { .. })
        ));
        assert!(matches!(
            stack.find_closest_peers(DhtScope::Auxiliary, local, 5).await,
            Err(DiscoveryError::DhtUnavailable(DhtScope::Auxiliary))
        ));
        assert_eq!(stack.dht_queries().len(), 3);
    }

    #[tokio::test]
    async fn test_event_queue() {
        let stack = MockStack::new();
        let peer = PeerId::random();
        stack.enqueue_event(StackEvent::ConnectionClosed { peer });

        assert_eq!(
            stack.next_event().await.unwrap(),
            StackEvent::ConnectionClosed { peer }
        );
        assert!(matches!(
            stack.next_event().await,
            Err(DiscoveryError::ChannelClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dial_delay() {
        let stack = MockStack::new().with_dial_delay(Duration::from_secs(3));
        let started = tokio::time::Instant::now();

        stack.dial(target(PeerId::random(), ADDR)).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }
}
