//! Coordinator lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the station coordinator.
///
/// Exactly one coordinator exists per process (one device, one cloud
/// identity), so this is also the lifecycle state of the device's cloud
/// pairing as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    /// No identity loaded; nothing has started (or everything was torn down).
    Uninitialized,
    /// Key material is loaded; registration has not completed.
    KeysReady,
    /// A service account was obtained this instant; announcement pending.
    Registered,
    /// Registered and waiting for the transport to establish the cloud socket.
    AwaitingConnection,
    /// Live cloud session; ticket service is active.
    Connected,
    /// A previously live session was lost; waiting to reconnect.
    Disconnected,
}

impl StationStatus {
    /// Returns true while a live cloud session exists.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true once a service account has been obtained.
    pub fn is_registered(&self) -> bool {
        matches!(
            self,
            Self::Registered | Self::AwaitingConnection | Self::Connected | Self::Disconnected
        )
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::KeysReady => "keys_ready",
            Self::Registered => "registered",
            Self::AwaitingConnection => "awaiting_connection",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{}", name)
    }
}
