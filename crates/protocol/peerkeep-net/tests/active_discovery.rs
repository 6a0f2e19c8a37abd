//! Active discovery, retry sweep and shutdown tests.
//!
//! Timing-sensitive tests run on paused tokio time so that warm-up delays,
//! discovery intervals and retry delays elapse instantly.

use libp2p::PeerId;
use peerkeep_net::{ClosestPeer, DhtScope, DiscoveryConfig, DiscoveryError};
use peerkeep_test_utils::*;
use peerkeep_types::{DiscoverySource, PeerStatus, StatusReason};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// =========================================================================
// DHT Discovery
// =========================================================================

#[tokio::test]
async fn test_failed_dht_instance_does_not_abort_cycle() {
    let peer = PeerId::random();
    let stack = MockStack::new()
        .with_dht_failure(DhtScope::Lan, "query timed out")
        .with_dht_peers(
            DhtScope::Wan,
            vec![ClosestPeer::with_addresses(peer, [tcp_address(1)])],
        );
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, DiscoveryConfig::default());

    let report = manager.perform_active_discovery().await;

    assert_eq!(report.found, 1);
    assert_eq!(report.connected, 1);
    let record = manager.get_peer(&peer).unwrap();
    assert_eq!(record.source, DiscoverySource::Dht);
    assert_eq!(record.status, PeerStatus::Connected);

    let scopes: Vec<DhtScope> = stack.dht_queries().iter().map(|(scope, _)| *scope).collect();
    assert_eq!(scopes, vec![DhtScope::Lan, DhtScope::Wan, DhtScope::Auxiliary]);
}

#[tokio::test(start_paused = true)]
async fn test_dht_results_are_deduplicated_and_truncated() {
    let peers = random_peers(4);
    let stack = MockStack::new()
        .with_dht_peers(
            DhtScope::Lan,
            peers[..3].iter().map(|p| ClosestPeer::new(*p)).collect(),
        )
        .with_dht_peers(
            DhtScope::Wan,
            peers[1..].iter().map(|p| ClosestPeer::new(*p)).collect(),
        );
    let config = DiscoveryConfig::default()
        .with_closest_peers_count(3)
        .with_dial_on_discovery(false);
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, config);

    let report = manager.perform_active_discovery().await;

    assert_eq!(report.found, 3);
    assert_eq!(manager.get_discovered_peers().len(), 3);
    assert!(manager.get_peer(&peers[3]).is_none());
    assert!(stack.dht_queries().iter().all(|(_, count)| *count == 3));
}

#[tokio::test]
async fn test_dht_peer_without_addresses_fails() {
    let peer = PeerId::random();
    let stack = MockStack::new().with_dht_peers(DhtScope::Lan, vec![ClosestPeer::new(peer)]);
    let config = DiscoveryConfig::default().with_dht_scopes(vec![DhtScope::Lan]);
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, config);

    manager.perform_active_discovery().await;

    let record = manager.get_peer(&peer).unwrap();
    assert_eq!(record.status, PeerStatus::Failed);
    assert_eq!(record.status_reason, Some(StatusReason::NoAddresses));
    assert_eq!(stack.dial_count(), 0);
}

#[tokio::test]
async fn test_dht_returning_local_peer_is_skipped() {
    let local = PeerId::random();
    let stack = MockStack::with_local_peer_id(local).with_dht_peers(
        DhtScope::Wan,
        vec![ClosestPeer::with_addresses(local, [tcp_address(1)])],
    );
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, DiscoveryConfig::default());

    manager.perform_active_discovery().await;

    assert!(manager.get_discovered_peers().is_empty());
    assert_eq!(stack.dial_count(), 0);
}

// =========================================================================
// Retry Sweep
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_sweep_waits_between_dials() {
    let stack = MockStack::new().with_default_dial(MockDial::Fail);
    let config = DiscoveryConfig::default().with_retry_delay(Duration::from_secs(5));
    let (manager, stack, gate) = create_test_manager_with_stack(stack, config);
    let peers = random_peers(3);
    for (i, peer) in peers.iter().enumerate() {
        manager
            .handle_event(discovered(*peer, &[tcp_address(i as u8 + 1)]))
            .await;
        gate.unblock(peer);
    }
    stack.set_default_dial(MockDial::Succeed);

    let started = Instant::now();
    let report = manager.perform_active_discovery().await;

    assert_eq!(report.recovered, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
    for peer in &peers {
        assert_eq!(manager.get_peer(peer).unwrap().status, PeerStatus::Connected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_sweep_skips_blocked_and_exhausted_peers() {
    let stack = MockStack::new().with_default_dial(MockDial::Fail);
    let config = DiscoveryConfig::default().with_max_attempts(2);
    let (manager, stack, gate) = create_test_manager_with_stack(stack, config);
    let (blocked, exhausted) = (PeerId::random(), PeerId::random());

    // One failure, and the block stays in place
    manager
        .handle_event(discovered(blocked, &[tcp_address(1)]))
        .await;

    // Two failures with the block lifted each time
    for _ in 0..2 {
        manager
            .handle_event(discovered(exhausted, &[tcp_address(2)]))
            .await;
        gate.unblock(&exhausted);
    }
    assert_eq!(manager.get_peer(&exhausted).unwrap().connection_attempts, 2);

    stack.set_default_dial(MockDial::Succeed);
    stack.clear_dials();
    let report = manager.perform_active_discovery().await;

    assert_eq!(report.recovered, 0);
    assert_eq!(stack.dial_count(), 0);
    assert_eq!(manager.get_peer(&blocked).unwrap().status, PeerStatus::Failed);
    assert_eq!(manager.get_peer(&exhausted).unwrap().status, PeerStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_error_status_is_retried() {
    let stack = MockStack::new();
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, DiscoveryConfig::default());
    let (errored, failed) = (PeerId::random(), PeerId::random());
    stack.set_peer_outcome(errored, MockDial::Unexpected("boom".into()));
    stack.set_peer_outcome(failed, MockDial::Fail);

    manager.connect_to_peer(errored, Some(vec![tcp_address(1)])).await;
    manager.connect_to_peer(failed, Some(vec![tcp_address(2)])).await;
    assert_eq!(manager.get_peer(&errored).unwrap().status, PeerStatus::Error);
    assert_eq!(manager.get_peer(&failed).unwrap().status, PeerStatus::Failed);

    stack.clear_outcomes();
    let report = manager.perform_active_discovery().await;

    // The failed peer is blocked after exhausting its addresses; the errored one is not
    assert_eq!(report.recovered, 1);
    assert_eq!(manager.get_peer(&errored).unwrap().status, PeerStatus::Connected);
    assert_eq!(manager.get_peer(&failed).unwrap().status, PeerStatus::Failed);
}

// =========================================================================
// Auto Discovery and Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_auto_discovery_runs_on_interval() {
    let stack = MockStack::new().with_dht_peers(DhtScope::Lan, vec![]);
    let config = DiscoveryConfig::default()
        .with_dht_scopes(vec![DhtScope::Lan])
        .with_warmup_delay(Duration::from_secs(2))
        .with_discovery_interval(Duration::from_secs(30));
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, config);

    manager.start_auto_discovery().unwrap();
    assert!(manager.is_running());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(stack.dht_queries().len(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(stack.dht_queries().len(), 3);

    assert!(manager.stop_auto_discovery());
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(stack.dht_queries().len(), 3);
    assert!(!manager.is_running());

    // Restartable until the manager itself is stopped
    manager.start_auto_discovery().unwrap();
    assert!(manager.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_in_flight_dial() {
    let stack = MockStack::new().with_dial_delay(Duration::from_secs(10));
    let (manager, stack, _gate) = create_test_manager_with_stack(stack, DiscoveryConfig::default());
    let manager = Arc::new(manager);
    let mut rx = manager.subscribe();
    let peer = PeerId::random();

    let dial = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.connect_to_peer(peer, Some(vec![tcp_address(1)])).await })
    };
    tokio::task::yield_now().await;
    assert_eq!(stack.dials_to(&peer), 1);

    manager.stop();

    assert!(!dial.await.unwrap());
    assert!(manager.get_discovered_peers().is_empty());
    assert!(manager.is_stopped());

    // The last summary is the empty registry
    let mut last = None;
    while let Ok(summary) = rx.try_recv() {
        last = Some(summary);
    }
    assert_eq!(last.unwrap().totals.total_discovered, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_event_loop_and_discovery() {
    let (manager, _stack, _gate) = create_test_manager(DiscoveryConfig::default());
    manager.start_auto_discovery().unwrap();

    manager.stop();
    manager.stop();

    assert!(!manager.is_running());
    assert!(manager.run_event_loop().await.is_ok());
    assert!(matches!(
        manager.start_auto_discovery(),
        Err(DiscoveryError::Stopped)
    ));
    assert_eq!(manager.perform_active_discovery().await.found, 0);
}
