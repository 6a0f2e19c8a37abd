//! Address capability filtering.
//!
//! Decides which endpoint strings the current execution environment can
//! dial, and turns a dialable address into a fully qualified dial target.

use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};
use peerkeep_types::StatusReason;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Transport tokens a sandboxed (browser) environment can dial.
const BROWSER_TRANSPORTS: &[&str] = &["wss", "webtransport", "webrtc", "webrtc-direct", "p2p-circuit"];

/// Transport tokens a native process can dial.
const NATIVE_TRANSPORTS: &[&str] = &[
    "tcp",
    "ws",
    "wss",
    "quic",
    "quic-v1",
    "webtransport",
    "webrtc-direct",
    "p2p-circuit",
];

/// The transports available in the environment the node runs in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportProfile {
    /// Secure and relay-capable transports only; no raw sockets.
    Browser,
    /// Everything a native process can open.
    #[default]
    Native,
    /// An explicit list of transport tokens.
    Custom(Vec<String>),
}

impl TransportProfile {
    /// The transport tokens this profile accepts.
    pub fn supported_transports(&self) -> Vec<String> {
        match self {
            Self::Browser => BROWSER_TRANSPORTS.iter().map(|t| t.to_string()).collect(),
            Self::Native => NATIVE_TRANSPORTS.iter().map(|t| t.to_string()).collect(),
            Self::Custom(tokens) => tokens.clone(),
        }
    }
}

/// Filters endpoint strings by the transports the environment supports.
#[derive(Debug, Clone)]
pub struct AddressFilter {
    supported: HashSet<String>,
}

impl AddressFilter {
    /// Build a filter for a transport profile.
    pub fn new(profile: &TransportProfile) -> Self {
        Self {
            supported: profile.supported_transports().into_iter().collect(),
        }
    }

    /// Returns true if any `/`-separated segment of the address is a
    /// supported transport token.
    pub fn is_dialable(&self, address: &str) -> bool {
        address
            .split('/')
            .any(|segment| !segment.is_empty() && self.supported.contains(segment))
    }

    /// The dialable subset of `addresses`, in input order.
    pub fn filter_dialable<S: AsRef<str>>(&self, addresses: &[S]) -> Vec<String> {
        addresses
            .iter()
            .map(AsRef::as_ref)
            .filter(|address| self.is_dialable(address))
            .map(str::to_string)
            .collect()
    }

    /// Dialable candidates, or the reason there are none.
    ///
    /// An empty input yields `NoAddresses`; a non-empty input with no
    /// dialable address yields `UnsupportedProtocols`.
    pub fn dial_candidates<S: AsRef<str>>(
        &self,
        addresses: &[S],
    ) -> Result<Vec<String>, StatusReason> {
        if addresses.is_empty() {
            return Err(StatusReason::NoAddresses);
        }

        let dialable = self.filter_dialable(addresses);
        if dialable.is_empty() {
            return Err(StatusReason::UnsupportedProtocols);
        }
        Ok(dialable)
    }
}

/// Build the dial target for `peer` at `address`.
///
/// If the address already ends with a `/p2p/<id>` component it is used
/// as-is; otherwise the peer's identity is appended. Returns `None` if the
/// address does not parse.
pub fn build_dial_target(address: &str, peer: &PeerId) -> Option<Multiaddr> {
    let mut target: Multiaddr = address.parse().ok()?;
    if target.is_empty() {
        return None;
    }

    if let Some(Protocol::P2p(embedded)) = target.iter().last() {
        if embedded != *peer {
            tracing::debug!(
                address = %address,
                embedded = %embedded,
                peer = %peer,
                "Address embeds a different peer"
            );
        }
        return Some(target);
    }

    target.push(Protocol::P2p(*peer));
    Some(target)
}
