//! Peer discovery and connection lifecycle management.
//!
//! This crate tracks the peers a node learns about, decides which of them
//! are worth dialing, dials them with bounded retries, and reports every
//! state change to observers. It includes:
//!
//! - **Peer Registry**: single source of truth for known peers and attempt counters
//! - **Address Filter**: which endpoints the current environment can dial
//! - **Connection Scheduler**: eligibility, dialing, retry sweep and blocking
//! - **DHT Discovery**: closest-peer lookups across several DHT instances
//! - **Event Notifier**: summary snapshots broadcast after every change
//!
//! # Overview
//!
//! The core never talks to a network library directly. The surrounding stack
//! is injected as a [`DiscoveryStack`] (dialing, closest-peer queries,
//! lifecycle events) and a [`ConnectionGate`] (block list and connection
//! ceiling). A peer moves through
//! `Discovered → Connecting → {Connected | Failed | Error}`; a disconnect
//! returns it to `Discovered`.
//!
//! # Example
//!
//! ```no_run
//! use peerkeep_net::{DiscoveryConfig, DiscoveryManager, DiscoveryStack};
//! use std::sync::Arc;
//!
//! async fn run(stack: Arc<dyn DiscoveryStack>) -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = DiscoveryManager::with_default_gate(stack, DiscoveryConfig::default())?;
//!
//!     // Watch the registry
//!     let mut summaries = manager.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(summary) = summaries.recv().await {
//!             println!("{} connected", summary.totals.connected);
//!         }
//!     });
//!
//!     // Feed stack events and query the DHT periodically
//!     let events = manager.spawn_event_loop();
//!     manager.start_auto_discovery()?;
//!
//!     events.await??;
//!     manager.stop();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dht;
pub mod error;
pub mod event;
pub mod filter;
pub mod gate;
pub mod manager;
pub mod notifier;
pub mod registry;
pub mod scheduler;
pub mod traits;

// Re-export main types at crate root

// Configuration
pub use config::DiscoveryConfig;

// Error types
pub use error::{DiscoveryError, DiscoveryResult};

// Event types
pub use event::StackEvent;

// Components
pub use dht::DhtDiscovery;
pub use filter::{build_dial_target, AddressFilter, TransportProfile};
pub use gate::{BlockList, DefaultConnectionGate};
pub use manager::{CycleReport, DiscoveryManager};
pub use notifier::EventNotifier;
pub use registry::{PeerRegistry, SharedRegistry};
pub use scheduler::ConnectionScheduler;

// Capability traits
pub use traits::{ClosestPeer, ConnectionGate, DhtScope, DiscoveryStack};

// Re-export libp2p types commonly needed
pub use libp2p::{multiaddr, Multiaddr, PeerId};
