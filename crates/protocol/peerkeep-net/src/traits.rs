//! Capabilities the discovery core consumes from the network stack.
//!
//! The core never talks to a network library directly. Everything it needs
//! (dialing, closest-peer lookups, lifecycle events, connection limits)
//! is injected at construction through these traits.

use crate::error::DiscoveryResult;
use crate::event::StackEvent;
use async_trait::async_trait;
use libp2p::{Multiaddr, PeerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the independent DHT instances a node may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DhtScope {
    /// Table restricted to local-network peers.
    Lan,
    /// Public, global table.
    Wan,
    /// Additional table run alongside the other two.
    Auxiliary,
}

impl DhtScope {
    /// All scopes, in query order.
    pub const ALL: [DhtScope; 3] = [DhtScope::Lan, DhtScope::Wan, DhtScope::Auxiliary];
}

impl fmt::Display for DhtScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lan => f.write_str("lan"),
            Self::Wan => f.write_str("wan"),
            Self::Auxiliary => f.write_str("auxiliary"),
        }
    }
}

/// A peer returned by a closest-peers query, with any addresses the DHT
/// knows for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosestPeer {
    pub peer_id: PeerId,
    pub addresses: Vec<String>,
}

impl ClosestPeer {
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            addresses: Vec::new(),
        }
    }

    pub fn with_addresses<I, S>(peer_id: PeerId, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            peer_id,
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }
}

/// The network stack as seen by the discovery core.
///
/// Implementations wrap a concrete P2P library. Every call must eventually
/// resolve: the core imposes no timeout of its own and relies on the
/// stack's dial and query timeouts.
#[async_trait]
pub trait DiscoveryStack: Send + Sync {
    /// The local node's identity. The core never dials it.
    fn local_peer_id(&self) -> PeerId;

    /// Attempt an outbound connection to a fully qualified dial target.
    ///
    /// Per-address failures should be reported as
    /// [`DiscoveryError::DialFailed`](crate::DiscoveryError::DialFailed),
    /// `Timeout` or `Transport`; any other error aborts the whole dial.
    async fn dial(&self, target: Multiaddr) -> DiscoveryResult<()>;

    /// Ask one DHT instance for the `count` peers closest to `target`.
    ///
    /// Returns [`DiscoveryError::DhtUnavailable`](crate::DiscoveryError::DhtUnavailable)
    /// if the node does not run that instance.
    async fn find_closest_peers(
        &self,
        scope: DhtScope,
        target: PeerId,
        count: usize,
    ) -> DiscoveryResult<Vec<ClosestPeer>>;

    /// Wait for the next lifecycle event.
    ///
    /// Returns [`DiscoveryError::ChannelClosed`](crate::DiscoveryError::ChannelClosed)
    /// once the stack will produce no more events.
    async fn next_event(&self) -> DiscoveryResult<StackEvent>;
}

/// Connection-manager collaborator consulted before every dial.
///
/// The block list is owned here; the core only reads it and requests
/// temporary blocks after repeated failure.
pub trait ConnectionGate: Send + Sync {
    /// Returns true if the peer is blocked and the block has not expired.
    fn is_peer_blocked(&self, peer: &PeerId) -> bool;

    /// Block the peer for `duration`.
    fn block_peer(&self, peer: PeerId, duration: Duration);

    /// Returns true if the global connection ceiling has room for one more.
    fn can_accept_new_connection(&self) -> bool;

    /// Called when the stack reports an opened connection.
    fn connection_opened(&self, _peer: &PeerId) {}

    /// Called when the stack reports the last connection to a peer closed.
    fn connection_closed(&self, _peer: &PeerId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify the traits can be made into trait objects
    fn _assert_stack_object_safe(_: &dyn DiscoveryStack) {}
    fn _assert_gate_object_safe(_: &dyn ConnectionGate) {}

    #[test]
    fn test_scope_display() {
        assert_eq!(DhtScope::Lan.to_string(), "lan");
        assert_eq!(DhtScope::Wan.to_string(), "wan");
        assert_eq!(DhtScope::Auxiliary.to_string(), "auxiliary");
    }

    #[test]
    fn test_closest_peer_addresses() {
        let peer = PeerId::random();
        let closest = ClosestPeer::with_addresses(peer, ["/ip4/10.0.0.1/tcp/4001"]);
        assert_eq!(closest.peer_id, peer);
        assert_eq!(closest.addresses.len(), 1);
        assert!(ClosestPeer::new(peer).addresses.is_empty());
    }
}
