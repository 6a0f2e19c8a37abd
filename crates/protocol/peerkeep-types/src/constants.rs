//! Default limits and timing for the discovery core.
//!
//! Every value here can be overridden through the discovery configuration;
//! these are the values a node starts with.

// =============================================================================
// Connection Attempts
// =============================================================================

/// Maximum dial attempts per peer before it stops being eligible.
pub const DEFAULT_MAX_CONNECTION_ATTEMPTS: u32 = 3;

/// How long a peer stays blocked after every address failed (60 seconds).
pub const DEFAULT_BLOCK_DURATION_MS: u64 = 60_000;

/// Delay between consecutive dials of one retry sweep (5 seconds).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5_000;

// =============================================================================
// Active Discovery
// =============================================================================

/// Interval between active discovery cycles (30 seconds).
pub const DEFAULT_DISCOVERY_INTERVAL_MS: u64 = 30_000;

/// Delay before the first discovery cycle after start (2 seconds).
pub const DEFAULT_WARMUP_DELAY_MS: u64 = 2_000;

/// Number of closest peers requested from each DHT instance.
pub const DEFAULT_CLOSEST_PEERS_COUNT: usize = 20;

// =============================================================================
// Connections and Notifications
// =============================================================================

/// Global ceiling on simultaneously open connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;

/// Buffered notifications kept for slow observers.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_constants() {
        assert_eq!(DEFAULT_BLOCK_DURATION_MS, 60_000);
        assert_eq!(DEFAULT_RETRY_DELAY_MS, 5_000);
        assert_eq!(DEFAULT_DISCOVERY_INTERVAL_MS, 30_000);
        assert!(DEFAULT_WARMUP_DELAY_MS < DEFAULT_DISCOVERY_INTERVAL_MS);
    }

    #[test]
    fn test_attempt_limit() {
        assert_eq!(DEFAULT_MAX_CONNECTION_ATTEMPTS, 3);
    }
}
