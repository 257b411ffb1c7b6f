//! Seam to the external cloud transport.
//!
//! The transport layer owns the actual socket to the cloud; the coordinator
//! never drives it. It receives a handle when the transport announces a
//! connection and only ever *observes* it (live state queries).

use serde::Serialize;
use std::fmt;

/// State of the cloud transport session, as reported by the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Handshake in progress.
    Connecting,
    /// Session is live.
    Connected,
    /// Session has been torn down.
    Disconnected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Handle to the live cloud socket maintained by the transport layer.
///
/// Implementations must answer state queries with the *current* transport
/// state, not a cached one.
pub trait CloudLink: Send + Sync + fmt::Debug {
    /// Current transport state.
    fn state(&self) -> LinkState;

    /// Convenience predicate over [`state`](Self::state).
    fn is_connected(&self) -> bool {
        matches!(self.state(), LinkState::Connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedLink(LinkState);

    impl CloudLink for FixedLink {
        fn state(&self) -> LinkState {
            self.0
        }
    }

    #[test]
    fn is_connected_follows_state() {
        assert!(FixedLink(LinkState::Connected).is_connected());
        assert!(!FixedLink(LinkState::Connecting).is_connected());
        assert!(!FixedLink(LinkState::Disconnected).is_connected());
    }

    #[test]
    fn link_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&LinkState::Connected).unwrap(),
            r#""connected""#
        );
        assert_eq!(
            serde_json::to_string(&LinkState::Disconnected).unwrap(),
            r#""disconnected""#
        );
    }
}
