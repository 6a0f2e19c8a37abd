//! DHT discovery adapter.
//!
//! Queries every configured DHT instance for the peers closest to the local
//! node and merges the answers. A failing instance is logged and skipped.

use crate::traits::{ClosestPeer, DhtScope, DiscoveryStack};
use libp2p::PeerId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Closest-peer lookups across several DHT instances.
pub struct DhtDiscovery {
    stack: Arc<dyn DiscoveryStack>,
    scopes: Vec<DhtScope>,
}

impl DhtDiscovery {
    pub fn new(stack: Arc<dyn DiscoveryStack>, scopes: Vec<DhtScope>) -> Self {
        Self { stack, scopes }
    }

    pub fn scopes(&self) -> &[DhtScope] {
        &self.scopes
    }

    /// Up to `count` distinct peers closest to the local node, across all
    /// configured instances.
    ///
    /// Peers are returned in first-seen order, instances queried in
    /// configuration order. Addresses reported for the same peer by several
    /// instances are merged. The registry is not touched.
    pub async fn find_closest_peers(&self, count: usize) -> Vec<ClosestPeer> {
        if count == 0 {
            return Vec::new();
        }

        let target = self.stack.local_peer_id();
        let mut merged: Vec<ClosestPeer> = Vec::new();
        let mut index: HashMap<PeerId, usize> = HashMap::new();

        for &scope in &self.scopes {
            let peers = match self.stack.find_closest_peers(scope, target, count).await {
                Ok(peers) => peers,
                Err(e) => {
                    warn!(scope = %scope, error = %e, "DHT query failed, skipping instance");
                    continue;
                }
            };
            debug!(scope = %scope, found = peers.len(), "DHT query returned");

            for peer in peers {
                match index.get(&peer.peer_id) {
                    Some(&i) => {
                        let existing = &mut merged[i];
                        for address in peer.addresses {
                            if !existing.addresses.contains(&address) {
                                existing.addresses.push(address);
                            }
                        }
                    }
                    None => {
                        index.insert(peer.peer_id, merged.len());
                        merged.push(peer);
                    }
                }
            }
        }

        merged.truncate(count);
        merged
    }
}
