//! Helpers for building managers and peers in tests.

use crate::{MockConnectionGate, MockStack};
use libp2p::PeerId;
use peerkeep_net::{DiscoveryConfig, DiscoveryManager, StackEvent};
use std::sync::Arc;

/// Create a manager over fresh mocks, returning the mocks for scripting
/// and inspection.
pub fn create_test_manager(config: DiscoveryConfig) -> (DiscoveryManager, MockStack, MockConnectionGate) {
    create_test_manager_with_stack(MockStack::new(), config)
}

/// Create a manager over a pre-scripted stack and a fresh gate.
pub fn create_test_manager_with_stack(
    stack: MockStack,
    config: DiscoveryConfig,
) -> (DiscoveryManager, MockStack, MockConnectionGate) {
    let gate = MockConnectionGate::new();
    let manager = DiscoveryManager::new(Arc::new(stack.clone()), Arc::new(gate.clone()), config)
        .expect("test config must be valid");
    (manager, stack, gate)
}

/// A TCP address on the private 10.0.0.0/8 range.
pub fn tcp_address(host: u8) -> String {
    format!("/ip4/10.0.0.{}/tcp/4001", host)
}

/// A secure WebSocket address, dialable from every profile.
pub fn wss_address(host: &str) -> String {
    format!("/dns4/{}/tcp/443/wss", host)
}

/// A passive discovery event for `peer`.
pub fn discovered(peer: PeerId, addresses: &[String]) -> StackEvent {
    StackEvent::PeerDiscovered {
        peer,
        addresses: addresses.to_vec(),
    }
}

/// A connection-opened event without a known remote address.
pub fn connection_opened(peer: PeerId) -> StackEvent {
    StackEvent::ConnectionOpened {
        peer,
        remote_address: None,
    }
}

/// A connection-closed event.
pub fn connection_closed(peer: PeerId) -> StackEvent {
    StackEvent::ConnectionClosed { peer }
}

/// `n` fresh random peer IDs.
pub fn random_peers(n: usize) -> Vec<PeerId> {
    (0..n).map(|_| PeerId::random()).collect()
}
