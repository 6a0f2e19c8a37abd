//! Peer registry.
//!
//! The registry is the single source of truth for known peers. Every
//! mutation goes through [`PeerRegistry::upsert`], [`PeerRegistry::set_status`]
//! or the attempt-counter methods; nothing else holds a mutable peer record.
//!
//! [`SharedRegistry`] wraps the registry in a lock and publishes a summary
//! through the [`EventNotifier`] after each mutation.

use crate::notifier::EventNotifier;
use libp2p::PeerId;
use parking_lot::RwLock;
use peerkeep_types::{
    current_timestamp, DiscoveredPeer, DiscoverySource, PeerStatus, StatusReason, Timestamp,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// In-memory map of known peers plus the connection attempt counters.
///
/// The attempt counter lives beside the records rather than inside them so
/// that throttling survives re-announcements. Each record's
/// `connection_attempts` field mirrors the counter.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, DiscoveredPeer>,
    attempts: HashMap<PeerId, u32>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or merge a record and return the current copy.
    ///
    /// `source` only applies to a new record; an existing record keeps the
    /// source it was first seen through.
    pub fn upsert<I, S>(
        &mut self,
        peer_id: PeerId,
        addresses: I,
        source: DiscoverySource,
        now: Timestamp,
    ) -> DiscoveredPeer
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attempts = self.attempts(&peer_id);
        let record = self.peers.entry(peer_id).or_insert_with(|| {
            debug!(peer = %peer_id, source = %source, "New peer");
            let mut record = DiscoveredPeer::new(peer_id, source, now);
            record.connection_attempts = attempts;
            record
        });

        let added = record.addresses.merge(addresses);
        if added > 0 {
            debug!(peer = %peer_id, added, total = record.addresses.len(), "Merged addresses");
        }
        record.last_status_update = now;
        record.clone()
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<DiscoveredPeer> {
        self.peers.get(peer_id).cloned()
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Status of a known peer.
    pub fn status(&self, peer_id: &PeerId) -> Option<PeerStatus> {
        self.peers.get(peer_id).map(|record| record.status)
    }

    /// Move a peer to `status`.
    ///
    /// Returns false, without changing anything, if the peer is unknown or
    /// the transition is not legal from its current status.
    pub fn set_status(
        &mut self,
        peer_id: &PeerId,
        status: PeerStatus,
        reason: Option<StatusReason>,
        now: Timestamp,
    ) -> bool {
        let Some(record) = self.peers.get_mut(peer_id) else {
            debug!(peer = %peer_id, status = %status, "Dropping status update for untracked peer");
            return false;
        };

        if !record.status.can_transition_to(status) {
            debug!(
                peer = %peer_id,
                from = %record.status,
                to = %status,
                "Ignoring illegal status transition"
            );
            return false;
        }

        if record.status != status {
            debug!(peer = %peer_id, from = %record.status, to = %status, "Status changed");
        }
        record.status = status;
        record.status_reason = reason;
        record.last_status_update = now;
        true
    }

    /// Copies of every record, oldest discovery first.
    pub fn snapshot_all(&self) -> Vec<DiscoveredPeer> {
        let mut peers: Vec<DiscoveredPeer> = self.peers.values().cloned().collect();
        peers.sort_by(|a, b| {
            a.discovered_at
                .cmp(&b.discovered_at)
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        peers
    }

    /// Empty the registry and every attempt counter. Returns the number of
    /// records removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.peers.len();
        self.peers.clear();
        self.attempts.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Dial attempts counted for `peer_id` since the last reset.
    pub fn attempts(&self, peer_id: &PeerId) -> u32 {
        self.attempts.get(peer_id).copied().unwrap_or(0)
    }

    /// Count one dial attempt and stamp `last_attempt`. Returns the new count.
    pub fn record_attempt(&mut self, peer_id: &PeerId, now: Timestamp) -> u32 {
        let count = self.attempts.entry(*peer_id).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;

        if let Some(record) = self.peers.get_mut(peer_id) {
            record.connection_attempts = count;
            record.last_attempt = Some(now);
        }
        count
    }

    /// Forget the attempts counted for `peer_id`.
    pub fn reset_attempts(&mut self, peer_id: &PeerId) {
        self.attempts.remove(peer_id);
        if let Some(record) = self.peers.get_mut(peer_id) {
            record.connection_attempts = 0;
        }
    }
}

/// Thread-safe registry handle that notifies observers on every mutation.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<PeerRegistry>>,
    notifier: EventNotifier,
}

impl SharedRegistry {
    pub fn new(notifier: EventNotifier) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PeerRegistry::new())),
            notifier,
        }
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// See [`PeerRegistry::upsert`].
    pub fn upsert<I, S>(&self, peer_id: PeerId, addresses: I, source: DiscoverySource) -> DiscoveredPeer
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = self.inner.write();
        let record = registry.upsert(peer_id, addresses, source, current_timestamp());
        // Broadcast under the write lock so summaries go out in mutation order.
        self.notifier.broadcast(&registry.snapshot_all());
        record
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<DiscoveredPeer> {
        self.inner.read().get(peer_id)
    }

    pub fn status(&self, peer_id: &PeerId) -> Option<PeerStatus> {
        self.inner.read().status(peer_id)
    }

    /// See [`PeerRegistry::set_status`]. Observers are only notified when the
    /// update applied.
    pub fn set_status(&self, peer_id: &PeerId, status: PeerStatus, reason: Option<StatusReason>) -> bool {
        let mut registry = self.inner.write();
        if !registry.set_status(peer_id, status, reason, current_timestamp()) {
            return false;
        }
        self.notifier.broadcast(&registry.snapshot_all());
        true
    }

    /// Like [`set_status`](Self::set_status), but leaves a connected peer
    /// untouched. The check and the update happen under one lock.
    pub fn set_status_unless_connected(
        &self,
        peer_id: &PeerId,
        status: PeerStatus,
        reason: Option<StatusReason>,
    ) -> bool {
        let mut registry = self.inner.write();
        if registry.status(peer_id) == Some(PeerStatus::Connected) {
            debug!(peer = %peer_id, status = %status, "Keeping connected peer");
            return false;
        }
        if !registry.set_status(peer_id, status, reason, current_timestamp()) {
            return false;
        }
        self.notifier.broadcast(&registry.snapshot_all());
        true
    }

    pub fn snapshot_all(&self) -> Vec<DiscoveredPeer> {
        self.inner.read().snapshot_all()
    }

    /// See [`PeerRegistry::clear`].
    pub fn clear(&self) -> usize {
        let mut registry = self.inner.write();
        let removed = registry.clear();
        self.notifier.broadcast(&[]);
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn attempts(&self, peer_id: &PeerId) -> u32 {
        self.inner.read().attempts(peer_id)
    }

    pub fn record_attempt(&self, peer_id: &PeerId) -> u32 {
        self.inner.write().record_attempt(peer_id, current_timestamp())
    }

    pub fn reset_attempts(&self, peer_id: &PeerId) {
        self.inner.write().reset_attempts(peer_id);
    }
}
