//! Discovery manager.
//!
//! This module implements the `DiscoveryManager`, the entry point the
//! application layer talks to. It owns the registry, the scheduler, the DHT
//! adapter and the background discovery task, and turns stack events into
//! registry updates.

use crate::config::DiscoveryConfig;
use crate::dht::DhtDiscovery;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::event::StackEvent;
use crate::gate::DefaultConnectionGate;
use crate::notifier::EventNotifier;
use crate::registry::SharedRegistry;
use crate::scheduler::ConnectionScheduler;
use crate::traits::{ConnectionGate, DiscoveryStack};
use libp2p::PeerId;
use parking_lot::Mutex;
use peerkeep_types::{
    DiscoveredPeer, DiscoverySource, DiscoveryStats, DiscoverySummary, PeerStatus, StatusReason,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What one active discovery cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Distinct peers returned by the DHT instances.
    pub found: usize,
    /// Peers that passed the eligibility check and were dialed.
    pub dialed: usize,
    /// Dials from this cycle that connected.
    pub connected: usize,
    /// Failed peers that connected during the retry sweep.
    pub recovered: usize,
}

struct ManagerInner {
    stack: Arc<dyn DiscoveryStack>,
    gate: Arc<dyn ConnectionGate>,
    registry: SharedRegistry,
    scheduler: ConnectionScheduler,
    dht: DhtDiscovery,
    config: DiscoveryConfig,
    local_peer_id: PeerId,
    stopped: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
}

struct DiscoveryTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// Peer discovery and connection lifecycle manager.
///
/// All methods take `&self`; the manager can be shared behind an `Arc`
/// between the event loop, the discovery task and the application.
pub struct DiscoveryManager {
    inner: Arc<ManagerInner>,
    discovery_task: Mutex<Option<DiscoveryTask>>,
}

impl DiscoveryManager {
    /// Create a manager over `stack`, consulting `gate` before every dial.
    ///
    /// Fails if the configuration does not validate.
    pub fn new(
        stack: Arc<dyn DiscoveryStack>,
        gate: Arc<dyn ConnectionGate>,
        config: DiscoveryConfig,
    ) -> DiscoveryResult<Self> {
        config.validate()?;

        let local_peer_id = stack.local_peer_id();
        let stopped = Arc::new(AtomicBool::new(false));
        let notifier = EventNotifier::new(config.notification_capacity);
        let registry = SharedRegistry::new(notifier);
        let scheduler = ConnectionScheduler::new(
            stack.clone(),
            gate.clone(),
            registry.clone(),
            config.clone(),
            stopped.clone(),
        );
        let dht = DhtDiscovery::new(stack.clone(), config.dht_scopes.clone());
        let (shutdown, _) = watch::channel(false);

        info!(local_peer = %local_peer_id, "Discovery manager created");

        Ok(Self {
            inner: Arc::new(ManagerInner {
                stack,
                gate,
                registry,
                scheduler,
                dht,
                config,
                local_peer_id,
                stopped,
                shutdown,
            }),
            discovery_task: Mutex::new(None),
        })
    }

    /// Create a manager with a [`DefaultConnectionGate`] sized to the
    /// default connection ceiling.
    pub fn with_default_gate(
        stack: Arc<dyn DiscoveryStack>,
        config: DiscoveryConfig,
    ) -> DiscoveryResult<Self> {
        Self::new(stack, Arc::new(DefaultConnectionGate::default()), config)
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.inner.local_peer_id
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.inner.config
    }

    /// Returns true if the manager has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// Apply one stack event.
    ///
    /// A discovery event may dial the peer before this returns. Events
    /// received after [`stop`](Self::stop) are ignored.
    pub async fn handle_event(&self, event: StackEvent) {
        self.inner.handle_event(event, false).await;
    }

    /// Pump events from the stack until it closes its channel or the manager
    /// stops.
    ///
    /// Dials triggered by discovery events run on their own tasks so that
    /// connection events keep flowing while a dial is pending.
    pub async fn run_event_loop(&self) -> DiscoveryResult<()> {
        self.inner.clone().run_event_loop().await
    }

    /// Spawn [`run_event_loop`](Self::run_event_loop) on the runtime.
    pub fn spawn_event_loop(&self) -> JoinHandle<DiscoveryResult<()>> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.run_event_loop().await })
    }

    /// Manually connect to a peer.
    ///
    /// The attempt counter is reset first, and the block list is not
    /// consulted. `addresses` are merged into the peer's record; an unknown
    /// peer is registered as passively discovered. Returns true if the peer
    /// is connected when this returns.
    pub async fn connect_to_peer(&self, peer_id: PeerId, addresses: Option<Vec<String>>) -> bool {
        let inner = &self.inner;
        if inner.is_stopped() {
            return false;
        }
        if peer_id == inner.local_peer_id {
            warn!("Refusing manual connection to the local node");
            return false;
        }

        let record = inner.registry.upsert(
            peer_id,
            addresses.unwrap_or_default(),
            DiscoverySource::PassiveDiscovery,
        );
        if record.is_connected() {
            debug!(peer = %peer_id, "Manual connection: already connected");
            return true;
        }

        info!(peer = %peer_id, "Manual connection");
        inner.registry.reset_attempts(&peer_id);
        inner.scheduler.schedule_dial(peer_id).await
    }

    /// Aggregated counters over the current registry.
    pub fn get_discovery_stats(&self) -> DiscoveryStats {
        DiscoveryStats::from_peers(&self.inner.registry.snapshot_all())
    }

    /// Snapshot of every known peer.
    pub fn get_discovered_peers(&self) -> Vec<DiscoveredPeer> {
        self.inner.registry.snapshot_all()
    }

    /// The current record for one peer.
    pub fn get_peer(&self, peer_id: &PeerId) -> Option<DiscoveredPeer> {
        self.inner.registry.get(peer_id)
    }

    /// Receive a [`DiscoverySummary`] after every registry change.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoverySummary> {
        self.inner.registry.notifier().subscribe()
    }

    /// Eligibility check used by every automatic dial.
    pub fn should_dial(&self, peer_id: &PeerId) -> bool {
        self.inner.scheduler.should_dial(peer_id)
    }

    /// Run one active discovery cycle now.
    pub async fn perform_active_discovery(&self) -> CycleReport {
        self.inner.perform_active_discovery().await
    }

    /// Start the background discovery task.
    ///
    /// The first cycle runs after the warm-up delay, then once per
    /// discovery interval. Starting an already running task is a no-op.
    pub fn start_auto_discovery(&self) -> DiscoveryResult<()> {
        if self.inner.is_stopped() {
            return Err(DiscoveryError::Stopped);
        }

        let mut task = self.discovery_task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Auto discovery already running");
            return Ok(());
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.discovery_loop(shutdown_rx).await });

        info!(
            warmup_ms = self.inner.config.warmup_delay.as_millis() as u64,
            interval_ms = self.inner.config.discovery_interval.as_millis() as u64,
            "Auto discovery started"
        );
        *task = Some(DiscoveryTask { handle, shutdown });
        Ok(())
    }

    /// Stop the background discovery task.
    ///
    /// A cycle already in progress runs to completion. Returns true if the
    /// task was running.
    pub fn stop_auto_discovery(&self) -> bool {
        let Some(task) = self.discovery_task.lock().take() else {
            return false;
        };

        let was_running = !task.handle.is_finished();
        let _ = task.shutdown.send(true);
        if was_running {
            info!("Auto discovery stopped");
        }
        was_running
    }

    /// Returns true while the background discovery task is running.
    pub fn is_running(&self) -> bool {
        self.discovery_task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Forget every known peer and attempt counter. Returns the number of
    /// peers removed.
    pub fn clear_discovery_list(&self) -> usize {
        let removed = self.inner.registry.clear();
        info!(removed, "Cleared discovered peers");
        removed
    }

    /// Shut the subsystem down.
    ///
    /// Stops the discovery task and the event loop and discards the
    /// registry. Dials still in flight are left to the stack; their outcome
    /// is ignored. A stopped manager cannot be restarted.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.stop_auto_discovery();
        let _ = self.inner.shutdown.send(true);
        let removed = self.inner.registry.clear();
        info!(removed, "Discovery manager stopped");
    }
}

impl Drop for DiscoveryManager {
    fn drop(&mut self) {
        if let Some(task) = self.discovery_task.get_mut().take() {
            let _ = task.shutdown.send(true);
        }
        // A spawned event loop holds its own handle on the inner state.
        let _ = self.inner.shutdown.send(true);
    }
}

impl ManagerInner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Apply `event`. With `spawn_dials`, a dial triggered by discovery runs
    /// on its own task instead of being awaited.
    async fn handle_event(self: &Arc<Self>, event: StackEvent, spawn_dials: bool) {
        if self.is_stopped() {
            debug!(peer = %event.peer(), "Ignoring event after stop");
            return;
        }
        if *event.peer() == self.local_peer_id {
            return;
        }

        match event {
            StackEvent::PeerDiscovered { peer, addresses } => {
                self.registry
                    .upsert(peer, addresses, DiscoverySource::PassiveDiscovery);

                if !self.config.dial_on_discovery || !self.scheduler.should_dial(&peer) {
                    return;
                }
                if spawn_dials {
                    let inner = self.clone();
                    tokio::spawn(async move {
                        inner.scheduler.schedule_dial(peer).await;
                    });
                } else {
                    self.scheduler.schedule_dial(peer).await;
                }
            }

            StackEvent::ConnectionOpened {
                peer,
                remote_address,
            } => {
                self.gate.connection_opened(&peer);
                let record =
                    self.registry
                        .upsert(peer, remote_address, DiscoverySource::ConnectionObserved);
                if record.is_connected() {
                    return;
                }

                if self.registry.set_status(&peer, PeerStatus::Connected, None) {
                    self.registry.reset_attempts(&peer);
                    info!(peer = %peer, "Connection opened");
                }
            }

            StackEvent::ConnectionClosed { peer } => {
                self.gate.connection_closed(&peer);
                if self.registry.status(&peer) != Some(PeerStatus::Connected) {
                    debug!(peer = %peer, "Connection closed for a peer that was not connected");
                    return;
                }

                self.registry.set_status(
                    &peer,
                    PeerStatus::Discovered,
                    Some(StatusReason::Disconnected),
                );
                info!(peer = %peer, "Connection closed");
            }
        }
    }

    async fn run_event_loop(self: Arc<Self>) -> DiscoveryResult<()> {
        let mut shutdown = self.shutdown.subscribe();
        info!("Discovery event loop started");

        loop {
            if self.is_stopped() || *shutdown.borrow() {
                break;
            }

            let event = tokio::select! {
                event = self.stack.next_event() => event,
                _ = shutdown.changed() => break,
            };

            match event {
                Ok(event) => self.handle_event(event, true).await,
                Err(DiscoveryError::ChannelClosed) => {
                    info!("Stack event channel closed");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "Discovery event loop failed");
                    return Err(e);
                }
            }
        }

        debug!("Discovery event loop stopped");
        Ok(())
    }

    async fn perform_active_discovery(&self) -> CycleReport {
        let mut report = CycleReport::default();
        if self.is_stopped() {
            return report;
        }

        let closest = self
            .dht
            .find_closest_peers(self.config.closest_peers_count)
            .await;
        report.found = closest.len();

        for peer in closest {
            if self.is_stopped() {
                return report;
            }
            if peer.peer_id == self.local_peer_id {
                continue;
            }

            self.registry
                .upsert(peer.peer_id, peer.addresses, DiscoverySource::Dht);
            if !self.scheduler.should_dial(&peer.peer_id) {
                continue;
            }

            report.dialed += 1;
            if self.scheduler.schedule_dial(peer.peer_id).await {
                report.connected += 1;
            }
        }

        if !self.is_stopped() {
            report.recovered = self.scheduler.retry_failed().await;
        }

        info!(
            found = report.found,
            dialed = report.dialed,
            connected = report.connected,
            recovered = report.recovered,
            "Discovery cycle finished"
        );
        report
    }

    async fn discovery_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.warmup_delay) => {}
            _ = shutdown.changed() => return,
        }

        let mut ticker = tokio::time::interval(self.config.discovery_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            if self.is_stopped() || *shutdown.borrow() {
                break;
            }

            self.perform_active_discovery().await;
        }
        debug!("Discovery loop exited");
    }
}
