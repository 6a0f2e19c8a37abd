//! Connection scheduler.
//!
//! Decides whether a peer may be dialed, drives the per-peer state machine
//! through a dial, and applies the retry and block policy.

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::filter::{build_dial_target, AddressFilter};
use crate::registry::SharedRegistry;
use crate::traits::{ConnectionGate, DiscoveryStack};
use futures::FutureExt;
use libp2p::PeerId;
use parking_lot::Mutex;
use peerkeep_types::{PeerStatus, StatusReason};
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a dial over every candidate address ended.
enum DialOutcome {
    Connected,
    Undialable(StatusReason),
    Exhausted,
}

/// Schedules and performs outbound dials.
pub struct ConnectionScheduler {
    stack: Arc<dyn DiscoveryStack>,
    gate: Arc<dyn ConnectionGate>,
    registry: SharedRegistry,
    filter: AddressFilter,
    config: DiscoveryConfig,
    local_peer_id: PeerId,
    in_flight: Mutex<HashSet<PeerId>>,
    stopped: Arc<AtomicBool>,
}

impl ConnectionScheduler {
    pub fn new(
        stack: Arc<dyn DiscoveryStack>,
        gate: Arc<dyn ConnectionGate>,
        registry: SharedRegistry,
        config: DiscoveryConfig,
        stopped: Arc<AtomicBool>,
    ) -> Self {
        let local_peer_id = stack.local_peer_id();
        Self {
            filter: AddressFilter::new(&config.transport_profile),
            stack,
            gate,
            registry,
            config,
            local_peer_id,
            in_flight: Mutex::new(HashSet::new()),
            stopped,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Returns true if `peer_id` is a dial candidate right now.
    ///
    /// All of the following must hold: it is not the local node, it is not
    /// blocked, it is not connected, its attempts are below the maximum and
    /// the gate has room for another connection.
    pub fn should_dial(&self, peer_id: &PeerId) -> bool {
        if *peer_id == self.local_peer_id {
            return false;
        }
        if self.gate.is_peer_blocked(peer_id) {
            return false;
        }
        if self.registry.status(peer_id) == Some(PeerStatus::Connected) {
            return false;
        }
        if self.registry.attempts(peer_id) >= self.config.max_attempts {
            return false;
        }
        self.gate.can_accept_new_connection()
    }

    /// Returns true if a dial to `peer_id` is currently running.
    pub fn is_dialing(&self, peer_id: &PeerId) -> bool {
        self.in_flight.lock().contains(peer_id)
    }

    /// Dial `peer_id` over its known addresses.
    ///
    /// Returns true once any address connects. Every failure, including a
    /// panic inside the stack, ends as `false` with the peer's status and
    /// reason updated in the registry.
    pub async fn schedule_dial(&self, peer_id: PeerId) -> bool {
        if self.is_stopped() {
            return false;
        }
        if peer_id == self.local_peer_id {
            debug!(peer = %peer_id, "Refusing to dial the local node");
            return false;
        }
        match self.registry.status(&peer_id) {
            None => {
                debug!(peer = %peer_id, "Cannot dial untracked peer");
                return false;
            }
            Some(PeerStatus::Connected) => return false,
            Some(_) => {}
        }

        let attempts = self.registry.attempts(&peer_id);
        if attempts >= self.config.max_attempts {
            debug!(peer = %peer_id, attempts, "Attempt limit reached, not dialing");
            return false;
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, peer_id) else {
            debug!(peer = %peer_id, "Dial already in flight");
            return false;
        };

        let attempt = self.registry.record_attempt(&peer_id);
        if !self
            .registry
            .set_status(&peer_id, PeerStatus::Connecting, None)
        {
            debug!(peer = %peer_id, "Cannot move peer to connecting");
            return false;
        }
        debug!(peer = %peer_id, attempt, max = self.config.max_attempts, "Dialing");

        let outcome = AssertUnwindSafe(self.dial_candidates(&peer_id))
            .catch_unwind()
            .await;

        if self.is_stopped() {
            debug!(peer = %peer_id, "Discarding dial outcome after stop");
            return false;
        }

        match outcome {
            Ok(Ok(DialOutcome::Connected)) => {
                info!(peer = %peer_id, attempt, "Connected");
                self.registry
                    .set_status(&peer_id, PeerStatus::Connected, None);
                self.registry.reset_attempts(&peer_id);
                true
            }
            Ok(Ok(DialOutcome::Undialable(reason))) => {
                warn!(peer = %peer_id, reason = %reason, "Peer is not dialable");
                self.registry
                    .set_status(&peer_id, PeerStatus::Failed, Some(reason));
                false
            }
            Ok(Ok(DialOutcome::Exhausted)) => {
                warn!(
                    peer = %peer_id,
                    attempt,
                    block_ms = self.config.block_duration.as_millis() as u64,
                    "All addresses failed, blocking peer"
                );
                let applied = self.registry.set_status(
                    &peer_id,
                    PeerStatus::Failed,
                    Some(StatusReason::AllAttemptsFailed),
                );
                // A concurrent inbound connection wins over a failed dial.
                if applied {
                    self.gate.block_peer(peer_id, self.config.block_duration);
                }
                false
            }
            Ok(Err(e)) => {
                error!(peer = %peer_id, error = %e, "Unexpected error while dialing");
                self.mark_error(&peer_id, e.to_string());
                false
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(peer = %peer_id, panic = %message, "Stack panicked while dialing");
                self.mark_error(&peer_id, message);
                false
            }
        }
    }

    async fn dial_candidates(&self, peer_id: &PeerId) -> DiscoveryResult<DialOutcome> {
        let addresses = self
            .registry
            .get(peer_id)
            .map(|record| record.addresses.to_vec())
            .unwrap_or_default();

        let candidates = match self.filter.dial_candidates(&addresses) {
            Ok(candidates) => candidates,
            Err(reason) => return Ok(DialOutcome::Undialable(reason)),
        };

        for address in &candidates {
            if self.is_stopped() {
                return Err(DiscoveryError::Stopped);
            }

            let Some(target) = build_dial_target(address, peer_id) else {
                debug!(peer = %peer_id, address = %address, "Skipping malformed address");
                continue;
            };

            match self.stack.dial(target).await {
                Ok(()) => {
                    debug!(peer = %peer_id, address = %address, "Dial succeeded");
                    return Ok(DialOutcome::Connected);
                }
                Err(e) if e.is_dial_failure() => {
                    debug!(peer = %peer_id, address = %address, error = %e, "Dial failed");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(DialOutcome::Exhausted)
    }

    fn mark_error(&self, peer_id: &PeerId, message: String) {
        // An inbound connection may have landed while the dial was failing.
        self.registry.set_status_unless_connected(
            peer_id,
            PeerStatus::Error,
            Some(StatusReason::Error(message)),
        );
    }

    /// Re-dial every `Failed` or `Error` peer that is still eligible, one at
    /// a time, pausing `retry_delay` before each dial after the first.
    ///
    /// Returns the number of peers that connected.
    pub async fn retry_failed(&self) -> usize {
        let candidates: Vec<PeerId> = self
            .registry
            .snapshot_all()
            .into_iter()
            .filter(|record| record.status.is_retry_eligible())
            .map(|record| record.peer_id)
            .collect();

        if candidates.is_empty() {
            return 0;
        }
        debug!(count = candidates.len(), "Retrying failed peers");

        let mut connected = 0;
        let mut dialed_any = false;
        for peer_id in candidates {
            if self.is_stopped() {
                break;
            }
            // Status may have moved on while we slept.
            let still_failed = self
                .registry
                .status(&peer_id)
                .is_some_and(|status| status.is_retry_eligible());
            if !still_failed || !self.should_dial(&peer_id) {
                continue;
            }

            if dialed_any {
                tokio::time::sleep(self.config.retry_delay).await;
                if self.is_stopped() || !self.should_dial(&peer_id) {
                    continue;
                }
            }
            dialed_any = true;

            if self.schedule_dial(peer_id).await {
                connected += 1;
            }
        }
        connected
    }
}

/// Marks a peer as being dialed for as long as it lives.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<PeerId>>,
    peer_id: PeerId,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<PeerId>>, peer_id: PeerId) -> Option<Self> {
        if set.lock().insert(peer_id) {
            Some(Self { set, peer_id })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.peer_id);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during dial".to_string()
    }
}
