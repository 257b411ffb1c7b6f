//! Lifecycle coordination.
//!
//! One coordinator exists per process — the device has exactly one cloud
//! identity. It consumes lifecycle signals from the bus and sequences
//! key loading, cloud registration, and ticket-service activation; the
//! reverse order on disconnect and shutdown.
//!
//! All transitions run on a single worker task, so overlapping signals are
//! serialized by construction. The one long-running transition (startup:
//! key generation + registration) still answers `Shutdown` immediately:
//! the in-flight work is dropped and its result discarded.

use std::path::PathBuf;
use std::sync::Arc;

use station_core::{ServiceAccount, StationIdentity, StationPaths, StationStatus};
use tokio::sync::{broadcast, RwLock};

use crate::bus::{EventBus, LifecycleSignal, StationEvent};
use crate::info::StationHandle;
use crate::keystore::{self, KeyStoreError};
use crate::link::CloudLink;
use crate::registration::{CloudClient, RegistrationError};
use crate::tickets::TicketService;

#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// An info or lookup operation was invoked outside the Connected state.
    #[error("station is not connected")]
    NotInitialized,

    #[error(transparent)]
    Keys(#[from] KeyStoreError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Live cloud session. Exists only while the coordinator is Connected, so
/// the token and the connect handle can never outlive the connection.
pub(crate) struct LinkSession {
    pub(crate) token: String,
    pub(crate) link: Arc<dyn CloudLink>,
}

impl std::fmt::Debug for LinkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSession")
            .field("token", &"[redacted]")
            .field("link", &self.link)
            .finish()
    }
}

/// Coordinator state, one variant per transition-table row. Each field
/// exists only in the states where it is valid.
#[derive(Debug)]
pub(crate) enum Station {
    Uninitialized,
    KeysReady {
        identity: StationIdentity,
    },
    Registered {
        identity: StationIdentity,
        account: ServiceAccount,
    },
    AwaitingConnection {
        identity: StationIdentity,
        account: ServiceAccount,
    },
    Connected {
        identity: StationIdentity,
        account: ServiceAccount,
        session: LinkSession,
    },
    Disconnected {
        identity: StationIdentity,
        account: ServiceAccount,
    },
}

impl Station {
    pub(crate) fn status(&self) -> StationStatus {
        match self {
            Self::Uninitialized => StationStatus::Uninitialized,
            Self::KeysReady { .. } => StationStatus::KeysReady,
            Self::Registered { .. } => StationStatus::Registered,
            Self::AwaitingConnection { .. } => StationStatus::AwaitingConnection,
            Self::Connected { .. } => StationStatus::Connected,
            Self::Disconnected { .. } => StationStatus::Disconnected,
        }
    }
}

/// The lifecycle coordinator. Construct once, then [`run`](Self::run) on a
/// dedicated task.
pub struct Coordinator {
    ctx: Ctx,
    signals: broadcast::Receiver<LifecycleSignal>,
}

struct Ctx {
    bus: EventBus,
    cloud: CloudClient,
    tickets: Arc<dyn TicketService>,
    state: Arc<RwLock<Station>>,
}

impl Coordinator {
    /// Create a coordinator wired to the given bus and collaborators.
    ///
    /// The signal subscription is taken here, not in [`run`](Self::run), so
    /// every signal emitted after construction is observed even if the
    /// worker task has not been polled yet.
    pub fn new(bus: EventBus, cloud: CloudClient, tickets: Arc<dyn TicketService>) -> Self {
        let signals = bus.subscribe_signals();
        Self {
            ctx: Ctx {
                bus,
                cloud,
                tickets,
                state: Arc::new(RwLock::new(Station::Uninitialized)),
            },
            signals,
        }
    }

    /// Query handle over the coordinator state (status, info, user lookup).
    pub fn handle(&self) -> StationHandle {
        StationHandle::new(Arc::clone(&self.ctx.state), self.ctx.cloud.clone())
    }

    /// Worker loop. Runs until the signal bus is closed.
    pub async fn run(self) {
        let Self { ctx, mut signals } = self;
        loop {
            match signals.recv().await {
                Ok(LifecycleSignal::StorageReady { root }) => {
                    ctx.handle_start(root, &mut signals).await;
                }
                Ok(LifecycleSignal::LinkUp { link, token }) => {
                    ctx.handle_link_up(link, token).await;
                }
                Ok(LifecycleSignal::LinkDown) => ctx.handle_link_down().await,
                Ok(LifecycleSignal::Shutdown) => ctx.handle_shutdown().await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "lifecycle signals lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("lifecycle bus closed; coordinator exiting");
                    break;
                }
            }
        }
    }
}

impl Ctx {
    /// Uninitialized → KeysReady → Registered → AwaitingConnection.
    ///
    /// Keeps listening on the signal queue while the keystore and the cloud
    /// are in flight: `Shutdown` abandons the work, every other signal is
    /// logged and dropped (the connect handler requires Registered state,
    /// and a second start is a duplicate).
    async fn handle_start(
        &self,
        root: PathBuf,
        signals: &mut broadcast::Receiver<LifecycleSignal>,
    ) {
        {
            let state = self.state.read().await;
            if !matches!(*state, Station::Uninitialized) {
                tracing::warn!(status = %state.status(), "start signal ignored; station already initialized");
                return;
            }
        }

        let paths = StationPaths::new(root);
        tracing::info!(root = %paths.root().display(), "station starting");

        let cloud = self.cloud.clone();
        let state = Arc::clone(&self.state);
        let init = async move {
            let identity = keystore::ensure_keys(&paths).await?;
            *state.write().await = Station::KeysReady {
                identity: identity.clone(),
            };
            let account = cloud
                .ensure_registered(&paths, &identity.public_key_pem)
                .await?;
            Ok::<(StationIdentity, ServiceAccount), StationError>((identity, account))
        };
        tokio::pin!(init);

        loop {
            tokio::select! {
                result = &mut init => {
                    self.finish_init(result).await;
                    return;
                }
                signal = signals.recv() => match signal {
                    Ok(LifecycleSignal::Shutdown) => {
                        tracing::info!("shutdown during startup; abandoning initialization");
                        *self.state.write().await = Station::Uninitialized;
                        return;
                    }
                    Ok(LifecycleSignal::StorageReady { .. }) => {
                        tracing::warn!("start signal ignored; initialization already in flight");
                    }
                    Ok(LifecycleSignal::LinkUp { .. }) => {
                        tracing::warn!("connection signal ignored before registration completed");
                    }
                    Ok(LifecycleSignal::LinkDown) => {
                        tracing::debug!("disconnect signal ignored during startup");
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "lifecycle signals lagged during startup");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Nobody can interrupt us anymore; just finish.
                        let result = init.await;
                        self.finish_init(result).await;
                        return;
                    }
                }
            }
        }
    }

    async fn finish_init(&self, result: Result<(StationIdentity, ServiceAccount), StationError>) {
        match result {
            Ok((identity, account)) => {
                *self.state.write().await = Station::Registered {
                    identity: identity.clone(),
                    account: account.clone(),
                };
                self.bus.emit_event(StationEvent::RegistrationFinished {
                    account: account.clone(),
                });
                tracing::info!(account = %account.id, "registration finished; awaiting cloud connection");
                *self.state.write().await = Station::AwaitingConnection { identity, account };
            }
            Err(e) => {
                // No retry is scheduled; the next start signal gets a fresh
                // attempt.
                tracing::error!(error = %e, "station startup failed");
                *self.state.write().await = Station::Uninitialized;
            }
        }
    }

    /// AwaitingConnection | Disconnected → Connected.
    ///
    /// Registration is never re-run here; a connection signal in any state
    /// before Registered is dropped.
    async fn handle_link_up(&self, link: Arc<dyn CloudLink>, token: String) {
        let mut state = self.state.write().await;
        match std::mem::replace(&mut *state, Station::Uninitialized) {
            Station::AwaitingConnection { identity, account }
            | Station::Disconnected { identity, account } => {
                self.tickets.activate(&account, Arc::clone(&link));
                *state = Station::Connected {
                    identity,
                    account,
                    session: LinkSession { token, link },
                };
                drop(state);
                self.bus.emit_event(StationEvent::Started);
                tracing::info!("station started");
            }
            other => {
                let status = other.status();
                *state = other;
                tracing::warn!(status = %status, "connection signal ignored in current state");
            }
        }
    }

    /// Connected → Disconnected. A no-op in every other state: teardown is
    /// idempotent and the ticket service is not touched when there was no
    /// live session.
    async fn handle_link_down(&self) {
        let mut state = self.state.write().await;
        match std::mem::replace(&mut *state, Station::Uninitialized) {
            Station::Connected {
                identity,
                account,
                session,
            } => {
                drop(session);
                self.tickets.deactivate();
                *state = Station::Disconnected { identity, account };
                drop(state);
                self.bus.emit_event(StationEvent::Stopped);
                tracing::info!("station stopped; cloud connection lost");
            }
            other => {
                let status = other.status();
                *state = other;
                tracing::debug!(status = %status, "disconnect signal ignored; no live session");
            }
        }
    }

    /// any → Uninitialized. Clears identity, account and session state; the
    /// ticket service is deactivated only if a session was live.
    async fn handle_shutdown(&self) {
        let mut state = self.state.write().await;
        match std::mem::replace(&mut *state, Station::Uninitialized) {
            Station::Uninitialized => {
                tracing::debug!("shutdown signal with nothing to tear down");
            }
            Station::Connected { session, .. } => {
                drop(session);
                self.tickets.deactivate();
                drop(state);
                self.bus.emit_event(StationEvent::Stopped);
                tracing::info!("station stopped");
            }
            _ => {
                drop(state);
                self.bus.emit_event(StationEvent::Stopped);
                tracing::info!("station stopped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkState;

    #[derive(Debug)]
    struct FixedLink;

    impl CloudLink for FixedLink {
        fn state(&self) -> LinkState {
            LinkState::Connected
        }
    }

    fn identity() -> StationIdentity {
        StationIdentity {
            public_key_pem: "pub".into(),
            private_key_pem: "priv".into(),
            public_key_path: "/tmp/station/station.pub.pem".into(),
            private_key_path: "/tmp/station/station.key.pem".into(),
        }
    }

    #[test]
    fn station_variants_map_to_statuses() {
        assert_eq!(Station::Uninitialized.status(), StationStatus::Uninitialized);
        assert_eq!(
            Station::KeysReady { identity: identity() }.status(),
            StationStatus::KeysReady
        );
        assert_eq!(
            Station::AwaitingConnection {
                identity: identity(),
                account: ServiceAccount::new("sa-1"),
            }
            .status(),
            StationStatus::AwaitingConnection
        );
        assert_eq!(
            Station::Connected {
                identity: identity(),
                account: ServiceAccount::new("sa-1"),
                session: LinkSession {
                    token: "tok".into(),
                    link: Arc::new(FixedLink),
                },
            }
            .status(),
            StationStatus::Connected
        );
    }

    #[test]
    fn link_session_debug_redacts_token() {
        let session = LinkSession {
            token: "very-secret".into(),
            link: Arc::new(FixedLink),
        };
        let debug = format!("{:?}", session);
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("very-secret"));
    }
}
