//! Lifecycle hooks for the authorization-ticket subsystem.
//!
//! Ticket issuance itself is a separate subsystem; the coordinator only
//! drives its lifecycle: activate once a cloud session is live, deactivate
//! when the session ends. Both hooks must be safe to call redundantly —
//! teardown paths never fail.

use std::sync::Arc;

use station_core::ServiceAccount;

use crate::link::CloudLink;

/// Lifecycle surface of the ticket subsystem.
pub trait TicketService: Send + Sync {
    /// Called when a cloud session is established. The service account and
    /// the live link are everything the ticket issuer needs to start
    /// serving.
    fn activate(&self, account: &ServiceAccount, link: Arc<dyn CloudLink>);

    /// Called when the session ends. Must be an idempotent no-op when the
    /// service is already inactive.
    fn deactivate(&self);
}

/// Attach point between the coordinator and the real ticket issuer.
///
/// Tracks whether a session is currently live and logs transitions; the
/// issuing machinery hangs off this from the outside.
#[derive(Debug, Default)]
pub struct TicketBridge {
    session: std::sync::Mutex<Option<ActiveSession>>,
}

#[derive(Debug)]
struct ActiveSession {
    account_id: String,
    link: Arc<dyn CloudLink>,
}

impl TicketBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a session is active.
    pub fn is_active(&self) -> bool {
        self.session.lock().expect("ticket bridge lock poisoned").is_some()
    }

    /// The link of the active session, if any. This is what the issuing
    /// machinery uses to reach the cloud.
    pub fn active_link(&self) -> Option<Arc<dyn CloudLink>> {
        self.session
            .lock()
            .expect("ticket bridge lock poisoned")
            .as_ref()
            .map(|active| Arc::clone(&active.link))
    }
}

impl TicketService for TicketBridge {
    fn activate(&self, account: &ServiceAccount, link: Arc<dyn CloudLink>) {
        let mut session = self.session.lock().expect("ticket bridge lock poisoned");
        if let Some(active) = session.as_ref() {
            tracing::warn!(
                account = %active.account_id,
                "ticket service already active; replacing session"
            );
        }
        tracing::info!(account = %account.id, "ticket service activated");
        *session = Some(ActiveSession {
            account_id: account.id.clone(),
            link,
        });
    }

    fn deactivate(&self) {
        let mut session = self.session.lock().expect("ticket bridge lock poisoned");
        if session.take().is_some() {
            tracing::info!("ticket service deactivated");
        }
    }
}
