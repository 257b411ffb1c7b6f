//! Typed lifecycle event bus.
//!
//! Two broadcast channels: inbound signals consumed by the coordinator
//! (emitted by the file subsystem, the transport and the process itself) and
//! outbound events produced by the coordinator for anyone who cares.
//! Broadcasts are fire-and-forget — sending with no subscribers is fine.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use station_core::ServiceAccount;
use tokio::sync::broadcast;

use crate::link::CloudLink;

/// Channel depth for both directions. Signals are rare (boot, connect,
/// disconnect, shutdown), so a small buffer suffices.
const BUS_CAPACITY: usize = 16;

/// Inbound lifecycle signals consumed by the coordinator.
#[derive(Clone)]
pub enum LifecycleSignal {
    /// The file subsystem is up; carries the writable storage root.
    StorageReady { root: PathBuf },
    /// The transport established the cloud socket.
    LinkUp {
        link: Arc<dyn CloudLink>,
        token: String,
    },
    /// The cloud socket was lost.
    LinkDown,
    /// The subsystem is being stopped.
    Shutdown,
}

// Manual Debug: the token is a credential and stays out of logs.
impl fmt::Debug for LifecycleSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageReady { root } => f
                .debug_struct("StorageReady")
                .field("root", root)
                .finish(),
            Self::LinkUp { link, .. } => f
                .debug_struct("LinkUp")
                .field("link", link)
                .field("token", &"[redacted]")
                .finish(),
            Self::LinkDown => write!(f, "LinkDown"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Outbound events produced by the coordinator.
#[derive(Debug, Clone)]
pub enum StationEvent {
    /// A service account was obtained; the station is reachable for pairing.
    RegistrationFinished { account: ServiceAccount },
    /// Cloud session live, ticket service active.
    Started,
    /// Cloud session gone, ticket service inactive.
    Stopped,
}

impl fmt::Display for StationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistrationFinished { account } => {
                write!(f, "registration finished (account {})", account.id)
            }
            Self::Started => write!(f, "station started"),
            Self::Stopped => write!(f, "station stopped"),
        }
    }
}

/// The process-wide lifecycle bus.
#[derive(Clone)]
pub struct EventBus {
    signals: broadcast::Sender<LifecycleSignal>,
    events: broadcast::Sender<StationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(BUS_CAPACITY);
        let (events, _) = broadcast::channel(BUS_CAPACITY);
        Self { signals, events }
    }

    /// Emit an inbound lifecycle signal.
    pub fn emit_signal(&self, signal: LifecycleSignal) {
        let _ = self.signals.send(signal);
    }

    /// Subscribe to inbound lifecycle signals.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<LifecycleSignal> {
        self.signals.subscribe()
    }

    /// Emit an outbound station event.
    pub fn emit_event(&self, event: StationEvent) {
        let _ = self.events.send(event);
    }

    /// Subscribe to outbound station events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<StationEvent> {
        self.events.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signals_reach_every_subscriber() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe_signals();
        let mut rx2 = bus.subscribe_signals();

        bus.emit_signal(LifecycleSignal::Shutdown);

        assert!(matches!(rx1.recv().await.unwrap(), LifecycleSignal::Shutdown));
        assert!(matches!(rx2.recv().await.unwrap(), LifecycleSignal::Shutdown));
    }

    #[tokio::test]
    async fn emitting_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit_signal(LifecycleSignal::LinkDown);
        bus.emit_event(StationEvent::Stopped);
    }

    #[tokio::test]
    async fn events_and_signals_are_independent_channels() {
        let bus = EventBus::new();
        let mut events = bus.subscribe_events();

        bus.emit_signal(LifecycleSignal::LinkDown);
        bus.emit_event(StationEvent::Started);

        // The event subscriber sees only the event.
        assert!(matches!(events.recv().await.unwrap(), StationEvent::Started));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn signal_debug_redacts_token() {
        #[derive(Debug)]
        struct FixedLink;
        impl CloudLink for FixedLink {
            fn state(&self) -> crate::link::LinkState {
                crate::link::LinkState::Connected
            }
        }

        let signal = LifecycleSignal::LinkUp {
            link: Arc::new(FixedLink),
            token: "super-secret-token".to_string(),
        };
        let debug = format!("{:?}", signal);
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("super-secret-token"));
    }
}
