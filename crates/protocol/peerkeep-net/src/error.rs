//! Discovery error types.
//!
//! This module defines all error types for the peerkeep-net crate.

use crate::traits::DhtScope;
use thiserror::Error;

/// Errors raised by the discovery core and by the stack it drives.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// The stack could not establish a connection on this address.
    #[error("dial failed: {0}")]
    DialFailed(String),

    /// The stack's own dial timeout elapsed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Transport layer error (TCP, WebSocket, relay, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// Address could not be parsed into a dial target.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The node does not run this DHT instance.
    #[error("DHT instance {0} is not available")]
    DhtUnavailable(DhtScope),

    /// A closest-peers query failed on one DHT instance.
    #[error("DHT query on {scope} failed: {reason}")]
    DhtQuery { scope: DhtScope, reason: String },

    /// The stack's event channel closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The discovery subsystem has been stopped.
    #[error("discovery stopped")]
    Stopped,

    /// Unexpected failure inside the stack or the core.
    #[error("internal error: {0}")]
    Internal(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiscoveryError {
    /// Returns true if this error only concerns the address being dialed.
    ///
    /// The scheduler moves on to the next candidate address for these and
    /// treats everything else as unexpected.
    pub fn is_dial_failure(&self) -> bool {
        matches!(
            self,
            Self::DialFailed(_) | Self::Timeout(_) | Self::Transport(_)
        )
    }

    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DialFailed(_)
                | Self::Timeout(_)
                | Self::Transport(_)
                | Self::DhtQuery { .. }
        )
    }

    /// Metric labels for monitoring integration.
    ///
    /// Returns `(category, variant)` suitable for use as metric labels.
    pub fn metric_labels(&self) -> (&'static str, &'static str) {
        match self {
            Self::DialFailed(_) => ("discovery", "dial_failed"),
            Self::Timeout(_) => ("discovery", "timeout"),
            Self::Transport(_) => ("discovery", "transport"),
            Self::InvalidAddress(_) => ("discovery", "invalid_address"),
            Self::DhtUnavailable(_) => ("dht", "unavailable"),
            Self::DhtQuery { .. } => ("dht", "query"),
            Self::ChannelClosed => ("discovery", "channel_closed"),
            Self::Stopped => ("discovery", "stopped"),
            Self::Internal(_) => ("discovery", "internal"),
            Self::Config(_) => ("discovery", "config"),
        }
    }
}

/// Result type alias using DiscoveryError.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiscoveryError::DialFailed("connection refused".to_string());
        assert_eq!(format!("{}", err), "dial failed: connection refused");

        let err = DiscoveryError::DhtUnavailable(DhtScope::Lan);
        assert_eq!(format!("{}", err), "DHT instance lan is not available");

        let err = DiscoveryError::DhtQuery {
            scope: DhtScope::Wan,
            reason: "query timed out".into(),
        };
        assert_eq!(format!("{}", err), "DHT query on wan failed: query timed out");
    }

    #[test]
    fn test_dial_failure_classification() {
        assert!(DiscoveryError::DialFailed("x".into()).is_dial_failure());
        assert!(DiscoveryError::Timeout("x".into()).is_dial_failure());
        assert!(DiscoveryError::Transport("x".into()).is_dial_failure());

        // A stack rejecting the target itself is unexpected, not a per-address failure
        assert!(!DiscoveryError::InvalidAddress("x".into()).is_dial_failure());
        assert!(!DiscoveryError::Internal("x".into()).is_dial_failure());
        assert!(!DiscoveryError::ChannelClosed.is_dial_failure());
        assert!(!DiscoveryError::Stopped.is_dial_failure());
    }

    #[test]
    fn test_is_transient() {
        assert!(DiscoveryError::Timeout("x".into()).is_transient());
        assert!(DiscoveryError::DhtQuery {
            scope: DhtScope::Auxiliary,
            reason: "x".into()
        }
        .is_transient());

        assert!(!DiscoveryError::DhtUnavailable(DhtScope::Lan).is_transient());
        assert!(!DiscoveryError::Config("x".into()).is_transient());
    }

    #[test]
    fn test_metric_labels() {
        let (cat, var) = DiscoveryError::Timeout("x".into()).metric_labels();
        assert_eq!(cat, "discovery");
        assert_eq!(var, "timeout");

        let (cat, var) = DiscoveryError::DhtUnavailable(DhtScope::Wan).metric_labels();
        assert_eq!(cat, "dht");
        assert_eq!(var, "unavailable");
    }
}
