//! Enum types for the discovery core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle status of a known peer.
///
/// The lifecycle is `Discovered → Connecting → {Connected | Failed | Error}`.
/// `Failed` and `Error` may return to `Connecting` on retry, and a
/// disconnect moves `Connected` back to `Discovered`. An inbound connection
/// observed by the stack may move any non-connected peer straight to
/// `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerStatus {
    /// Known, not connected, no dial in progress
    #[default]
    Discovered,
    /// An outbound dial is in progress
    Connecting,
    /// At least one connection is open
    Connected,
    /// Every candidate address failed, or none was usable
    Failed,
    /// An unexpected error aborted the last dial
    Error,
}

impl PeerStatus {
    /// Returns true if a retry sweep may dial this peer again.
    pub fn is_retry_eligible(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Returns true if the peer counts toward active connections.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    ///
    /// Re-entering the current status is always legal (it refreshes the
    /// status timestamp). `Error` is reachable from everywhere.
    pub fn can_transition_to(&self, next: PeerStatus) -> bool {
        use PeerStatus::*;

        if *self == next || next == Error {
            return true;
        }

        matches!(
            (self, next),
            (Discovered, Connecting)
                | (Discovered, Connected)
                | (Connecting, Connected)
                | (Connecting, Failed)
                | (Connected, Discovered)
                | (Failed, Connecting)
                | (Failed, Connected)
                | (Error, Connecting)
                | (Error, Connected)
        )
    }
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovered => "discovered",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// How a peer first entered the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    /// Local broadcast discovery (mDNS, bootstrap lists, pubsub peer discovery)
    #[default]
    PassiveDiscovery,
    /// Closest-peer lookup on one of the DHT instances
    Dht,
    /// The peer connected to us before we learned about it
    ConnectionObserved,
}

impl DiscoverySource {
    /// All sources, in reporting order.
    pub const ALL: [DiscoverySource; 3] = [
        DiscoverySource::PassiveDiscovery,
        DiscoverySource::Dht,
        DiscoverySource::ConnectionObserved,
    ];
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PassiveDiscovery => "passive-discovery",
            Self::Dht => "dht",
            Self::ConnectionObserved => "connection-observed",
        };
        f.write_str(s)
    }
}

/// Why a peer ended up in its current status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusReason {
    /// The peer has no known addresses
    NoAddresses,
    /// None of the peer's addresses uses a transport this node can dial
    UnsupportedProtocols,
    /// Every candidate address was dialed and failed
    AllAttemptsFailed,
    /// The last open connection closed
    Disconnected,
    /// An unexpected error, with its message
    Error(String),
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAddresses => f.write_str("no-addresses"),
            Self::UnsupportedProtocols => f.write_str("unsupported-protocols"),
            Self::AllAttemptsFailed => f.write_str("all-attempts-failed"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Error(message) => f.write_str(message),
        }
    }
}
