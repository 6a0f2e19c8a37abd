//! Summary notifications for external observers.

use peerkeep_types::{current_timestamp, DiscoveredPeer, DiscoverySummary};
use tokio::sync::broadcast;
use tracing::trace;

/// Pushes a [`DiscoverySummary`] to every subscriber after each registry
/// mutation.
///
/// Observers that fall behind lose the oldest summaries; each summary is a
/// full snapshot, so only the latest one matters.
#[derive(Debug, Clone)]
pub struct EventNotifier {
    sender: broadcast::Sender<DiscoverySummary>,
}

impl EventNotifier {
    /// Create a notifier buffering up to `capacity` summaries per subscriber.
    ///
    /// `capacity` must be non-zero; `DiscoveryConfig::validate` enforces this.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoverySummary> {
        self.sender.subscribe()
    }

    /// Number of live observers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Summarize `snapshot` and send it to all observers.
    pub fn broadcast(&self, snapshot: &[DiscoveredPeer]) -> DiscoverySummary {
        let summary = DiscoverySummary::from_peers(snapshot, current_timestamp());

        // No subscribers is not an error.
        if self.sender.send(summary.clone()).is_err() {
            trace!("No observers for discovery summary");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libp2p::PeerId;
    use peerkeep_types::{DiscoverySource, PeerStatus};

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = EventNotifier::new(8);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        let mut peer = DiscoveredPeer::new(PeerId::random(), DiscoverySource::Dht, 0);
        peer.status = PeerStatus::Connected;
        notifier.broadcast(&[peer]);

        let summary = first.recv().await.unwrap();
        assert_eq!(summary.totals.connected, 1);
        assert_eq!(summary.source(DiscoverySource::Dht).connected, 1);
        assert_eq!(second.recv().await.unwrap(), summary);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let notifier = EventNotifier::new(1);
        let summary = notifier.broadcast(&[]);
        assert_eq!(summary.totals.total_discovered, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let notifier = EventNotifier::new(0);
        let _rx = notifier.subscribe();
        notifier.broadcast(&[]);
    }
}
