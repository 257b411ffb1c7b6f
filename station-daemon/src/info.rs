//! Read-only queries over the coordinator state.
//!
//! Both operations are gated on the Connected state: before that, parts of
//! the snapshot simply do not exist, and the lookup has no session token to
//! authenticate with.

use std::sync::Arc;

use serde::Serialize;
use station_core::{ServiceAccount, StationStatus, UserInfo};
use tokio::sync::RwLock;

use crate::coordinator::{Station, StationError};
use crate::link::LinkState;
use crate::registration::CloudClient;

/// Snapshot of a connected station.
#[derive(Debug, Clone, Serialize)]
pub struct StationInfo {
    /// The cloud's record for this device.
    pub account: ServiceAccount,
    /// Transport state, queried live from the connect handle.
    pub link_state: LinkState,
    /// The device public key, PEM-encoded.
    pub public_key_pem: String,
}

/// Cloneable query handle over the coordinator.
#[derive(Clone)]
pub struct StationHandle {
    state: Arc<RwLock<Station>>,
    cloud: CloudClient,
}

impl StationHandle {
    pub(crate) fn new(state: Arc<RwLock<Station>>, cloud: CloudClient) -> Self {
        Self { state, cloud }
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> StationStatus {
        self.state.read().await.status()
    }

    /// Snapshot of account, live link state and public key.
    ///
    /// # Errors
    ///
    /// [`StationError::NotInitialized`] outside the Connected state.
    pub async fn current_info(&self) -> Result<StationInfo, StationError> {
        match &*self.state.read().await {
            Station::Connected {
                identity,
                account,
                session,
            } => Ok(StationInfo {
                account: account.clone(),
                link_state: session.link.state(),
                public_key_pem: identity.public_key_pem.clone(),
            }),
            _ => Err(StationError::NotInitialized),
        }
    }

    /// Look up a remote user at the cloud, authenticated with the session
    /// token.
    ///
    /// # Errors
    ///
    /// [`StationError::NotInitialized`] outside the Connected state;
    /// otherwise any registration-client error from the lookup itself.
    pub async fn lookup_remote_user(&self, guid: &str) -> Result<UserInfo, StationError> {
        let token = match &*self.state.read().await {
            Station::Connected { session, .. } => session.token.clone(),
            _ => return Err(StationError::NotInitialized),
        };
        Ok(self.cloud.lookup_user(guid, &token).await?)
    }
}
