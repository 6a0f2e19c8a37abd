//! The discovered peer record.

use crate::enums::{DiscoverySource, PeerStatus, StatusReason};
use libp2p::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
pub fn current_timestamp() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Set of endpoint strings known for a peer.
///
/// Insertion order is irrelevant and duplicates are suppressed. Iteration
/// is in sorted order, which is also the order addresses are dialed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressSet(BTreeSet<String>);

impl AddressSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address. Returns true if it was not already present.
    pub fn insert(&mut self, address: impl Into<String>) -> bool {
        self.0.insert(address.into())
    }

    /// Union `other` into this set. Returns the number of new addresses.
    pub fn merge<I, S>(&mut self, other: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for address in other {
            if self.0.insert(address.into()) {
                added += 1;
            }
        }
        added
    }

    /// Returns true if the address is present.
    pub fn contains(&self, address: &str) -> bool {
        self.0.contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Addresses as an owned vector, in dial order.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for AddressSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A peer known to the registry, with its discovery and connection metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeer {
    /// Stable node identifier; unique key of the registry.
    pub peer_id: PeerId,
    /// Known endpoint strings.
    pub addresses: AddressSet,
    /// When the peer was first recorded.
    pub discovered_at: Timestamp,
    /// When the record was last upserted or changed status.
    pub last_status_update: Timestamp,
    /// When the last outbound dial started.
    pub last_attempt: Option<Timestamp>,
    /// How the peer first entered the registry.
    pub source: DiscoverySource,
    /// Current lifecycle status.
    pub status: PeerStatus,
    /// Why the peer is in its current status, if there is a reason to give.
    pub status_reason: Option<StatusReason>,
    /// Dial attempts since the last reset or successful connection.
    pub connection_attempts: u32,
}

impl DiscoveredPeer {
    /// Create a fresh record in `Discovered` status.
    pub fn new(peer_id: PeerId, source: DiscoverySource, now: Timestamp) -> Self {
        Self {
            peer_id,
            addresses: AddressSet::new(),
            discovered_at: now,
            last_status_update: now,
            last_attempt: None,
            source,
            status: PeerStatus::Discovered,
            status_reason: None,
            connection_attempts: 0,
        }
    }

    /// Returns true if the peer currently counts as an active connection.
    pub fn is_connected(&self) -> bool {
        self.status.is_active()
    }
}
