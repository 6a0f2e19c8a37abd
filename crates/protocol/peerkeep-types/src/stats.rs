//! Aggregated counters over the registry and the notification payload.

use crate::enums::{DiscoverySource, PeerStatus};
use crate::peer::{DiscoveredPeer, Timestamp};
use libp2p::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status counts over a set of peers.
///
/// `failed` covers both `Failed` and `Error`; the two stay distinct on each
/// peer record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total_discovered: usize,
    pub connected: usize,
    pub connecting: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: PeerStatus) {
        self.total_discovered += 1;
        match status {
            PeerStatus::Connected => self.connected += 1,
            PeerStatus::Connecting => self.connecting += 1,
            PeerStatus::Failed | PeerStatus::Error => self.failed += 1,
            PeerStatus::Discovered => {}
        }
    }
}

/// Notification broadcast to observers after every registry change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySummary {
    /// Counts over the whole registry.
    pub totals: StatusCounts,
    /// Counts partitioned by discovery source. Every source is present.
    pub by_source: BTreeMap<DiscoverySource, StatusCounts>,
    /// When the summary was computed.
    pub timestamp: Timestamp,
}

impl DiscoverySummary {
    /// Summarize a registry snapshot.
    pub fn from_peers(peers: &[DiscoveredPeer], timestamp: Timestamp) -> Self {
        let mut by_source: BTreeMap<DiscoverySource, StatusCounts> = DiscoverySource::ALL
            .iter()
            .map(|source| (*source, StatusCounts::default()))
            .collect();
        let mut totals = StatusCounts::default();

        for peer in peers {
            totals.record(peer.status);
            by_source.entry(peer.source).or_default().record(peer.status);
        }

        Self {
            totals,
            by_source,
            timestamp,
        }
    }

    /// Counts for a single source.
    pub fn source(&self, source: DiscoverySource) -> StatusCounts {
        self.by_source.get(&source).copied().unwrap_or_default()
    }
}

/// Discovery statistics exposed to the application layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStats {
    pub total_discovered: usize,
    pub connected: usize,
    pub connecting: usize,
    /// Peers in `Discovered` status.
    pub discovered: usize,
    /// Peers in `Failed` or `Error` status.
    pub failed: usize,
    pub connected_peers: Vec<PeerId>,
}

impl DiscoveryStats {
    /// Compute statistics from a registry snapshot.
    pub fn from_peers(peers: &[DiscoveredPeer]) -> Self {
        let mut stats = Self {
            total_discovered: peers.len(),
            ..Self::default()
        };

        for peer in peers {
            match peer.status {
                PeerStatus::Connected => {
                    stats.connected += 1;
                    stats.connected_peers.push(peer.peer_id);
                }
                PeerStatus::Connecting => stats.connecting += 1,
                PeerStatus::Discovered => stats.discovered += 1,
                PeerStatus::Failed | PeerStatus::Error => stats.failed += 1,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(source: DiscoverySource, status: PeerStatus) -> DiscoveredPeer {
        let mut peer = DiscoveredPeer::new(PeerId::random(), source, 0);
        peer.status = status;
        peer
    }

    #[test]
    fn test_summary_partitions_by_source() {
        let peers = vec![
            peer(DiscoverySource::PassiveDiscovery, PeerStatus::Connected),
            peer(DiscoverySource::PassiveDiscovery, PeerStatus::Failed),
            peer(DiscoverySource::Dht, PeerStatus::Connecting),
            peer(DiscoverySource::Dht, PeerStatus::Error),
        ];

        let summary = DiscoverySummary::from_peers(&peers, 7);

        assert_eq!(summary.totals.total_discovered, 4);
        assert_eq!(summary.totals.connected, 1);
        assert_eq!(summary.totals.connecting, 1);
        assert_eq!(summary.totals.failed, 2);

        let passive = summary.source(DiscoverySource::PassiveDiscovery);
        assert_eq!(passive.total_discovered, 2);
        assert_eq!(passive.connected, 1);

        let dht = summary.source(DiscoverySource::Dht);
        assert_eq!(dht.connecting, 1);
        assert_eq!(dht.failed, 1);

        assert_eq!(
            summary.source(DiscoverySource::ConnectionObserved),
            StatusCounts::default()
        );
        assert_eq!(summary.timestamp, 7);
    }

    #[test]
    fn test_empty_summary_lists_every_source() {
        let summary = DiscoverySummary::from_peers(&[], 0);
        assert_eq!(summary.by_source.len(), DiscoverySource::ALL.len());
        assert_eq!(summary.totals, StatusCounts::default());
    }

    #[test]
    fn test_stats_collect_connected_peers() {
        let connected = peer(DiscoverySource::Dht, PeerStatus::Connected);
        let connected_id = connected.peer_id;
        let peers = vec![
            connected,
            peer(DiscoverySource::Dht, PeerStatus::Discovered),
            peer(DiscoverySource::Dht, PeerStatus::Error),
        ];

        let stats = DiscoveryStats::from_peers(&peers);

        assert_eq!(stats.total_discovered, 3);
        assert_eq!(stats.connected, 1);
        assert_eq!(stats.discovered, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.connected_peers, vec![connected_id]);
    }
}
