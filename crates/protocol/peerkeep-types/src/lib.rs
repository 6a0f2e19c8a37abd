//! Data structures for the Peerkeep discovery core.
//!
//! This crate holds the types shared between the connection lifecycle
//! manager and the layers that render or inspect it. It contains no
//! business logic, only type definitions with serialization support.
//!
//! # Module Organization
//!
//! - [`enums`] - Peer status, discovery source and status reasons
//! - [`constants`] - Default limits and timing
//! - [`peer`] - The discovered peer record and its address set
//! - [`stats`] - Aggregated counters and the notification payload
//!
//! # Example
//!
//! ```
//! use peerkeep_types::{AddressSet, DiscoveredPeer, DiscoverySource, PeerStatus};
//! use libp2p::PeerId;
//!
//! let peer = PeerId::random();
//! let mut record = DiscoveredPeer::new(peer, DiscoverySource::PassiveDiscovery, 1_000);
//! record.addresses.insert("/ip4/10.0.0.1/tcp/4001");
//! record.addresses.insert("/ip4/10.0.0.1/tcp/4001");
//!
//! assert_eq!(record.addresses.len(), 1);
//! assert_eq!(record.status, PeerStatus::Discovered);
//! ```

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod enums;
pub mod peer;
pub mod stats;

// Enums
pub use enums::{DiscoverySource, PeerStatus, StatusReason};

// Constants
pub use constants::*;

// Peer record
pub use peer::{current_timestamp, AddressSet, DiscoveredPeer, Timestamp};

// Statistics
pub use stats::{DiscoveryStats, DiscoverySummary, StatusCounts};
