//! Lifecycle events reported by the network stack.

use libp2p::PeerId;

/// Events the stack delivers to the discovery core.
///
/// These are returned by `DiscoveryStack::next_event()` or passed directly
/// to `DiscoveryManager::handle_event()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StackEvent {
    /// A peer was announced by passive discovery (mDNS, bootstrap, pubsub).
    PeerDiscovered {
        /// The announced peer.
        peer: PeerId,
        /// Addresses advertised with the announcement.
        addresses: Vec<String>,
    },

    /// The first connection to a peer was opened, in either direction.
    ///
    /// Further connections to an already connected peer are not reported.
    ConnectionOpened {
        /// The remote peer.
        peer: PeerId,
        /// The remote endpoint, if the stack knows it.
        remote_address: Option<String>,
    },

    /// The last open connection to a peer closed.
    ConnectionClosed {
        /// The remote peer.
        peer: PeerId,
    },
}

impl StackEvent {
    /// The peer this event concerns.
    pub fn peer(&self) -> &PeerId {
        match self {
            StackEvent::PeerDiscovered { peer, .. } => peer,
            StackEvent::ConnectionOpened { peer, .. } => peer,
            StackEvent::ConnectionClosed { peer } => peer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_peer() {
        let peer = PeerId::random();

        let event = StackEvent::ConnectionClosed { peer };
        assert_eq!(event.peer(), &peer);

        let event = StackEvent::PeerDiscovered {
            peer,
            addresses: vec![],
        };
        assert_eq!(event.peer(), &peer);
    }
}
