//! Cloud registration and lookups.
//!
//! Registration is at-most-once per storage root: once a service-account
//! record exists on disk it is the answer, and the cloud is never asked
//! again. The record is the `data` payload of the registration response,
//! persisted verbatim.

use std::io;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use station_core::{ServiceAccount, StationPaths, UserInfo};
use tokio::fs;

/// Per-request deadline for cloud calls.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Record read/write failure other than a missing file.
    #[error("service-account record I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted record (or the cloud payload) is not a valid
    /// service-account document.
    #[error("malformed service-account record: {0}")]
    Parse(#[from] serde_json::Error),

    /// The cloud could not be reached, or the response body could not be
    /// read.
    #[error("cloud transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The cloud answered with a non-success status.
    #[error("cloud rejected the request: HTTP {0}")]
    Rejected(StatusCode),
}

/// Response envelope used by every cloud endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for the cloud control plane.
#[derive(Debug, Clone)]
pub struct CloudClient {
    base: String,
    http: reqwest::Client,
}

impl CloudClient {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    /// Return the persisted service account, registering with the cloud
    /// first if no record exists yet.
    ///
    /// No automatic retry: a failed registration surfaces to the caller,
    /// who owns the retry policy.
    pub async fn ensure_registered(
        &self,
        paths: &StationPaths,
        public_key_pem: &str,
    ) -> Result<ServiceAccount, RegistrationError> {
        let record = paths.service_account();
        match fs::read(&record).await {
            Ok(bytes) => {
                let account: ServiceAccount = serde_json::from_slice(&bytes)?;
                tracing::debug!(account = %account.id, "loaded persisted service account");
                Ok(account)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.register(paths, public_key_pem).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One-time registration of the device public key.
    async fn register(
        &self,
        paths: &StationPaths,
        public_key_pem: &str,
    ) -> Result<ServiceAccount, RegistrationError> {
        let url = format!("{}/v1/stations", self.base);
        tracing::info!(url = %url, "registering station with cloud");

        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({ "publicKey": public_key_pem }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistrationError::Rejected(status));
        }

        let envelope: Envelope<serde_json::Value> = response.json().await?;
        let account: ServiceAccount = serde_json::from_value(envelope.data.clone())?;

        // Persist the cloud payload verbatim; re-reading it must yield the
        // structure returned here.
        fs::create_dir_all(paths.station_dir()).await?;
        fs::write(
            paths.service_account(),
            serde_json::to_string_pretty(&envelope.data)?,
        )
        .await?;

        tracing::info!(account = %account.id, "station registered");
        Ok(account)
    }

    /// Authenticated lookup of a remote user record.
    pub async fn lookup_user(
        &self,
        guid: &str,
        token: &str,
    ) -> Result<UserInfo, RegistrationError> {
        let url = format!("{}/v1/users/{}", self.base, guid);
        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header(AUTHORIZATION, token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistrationError::Rejected(status));
        }

        let envelope: Envelope<UserInfo> = response.json().await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_PEM: &str = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";

    fn paths_in(dir: &tempfile::TempDir) -> StationPaths {
        StationPaths::new(dir.path())
    }

    #[tokio::test]
    async fn existing_record_is_answered_without_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(&dir);
        std::fs::create_dir_all(paths.station_dir()).unwrap();
        std::fs::write(
            paths.service_account(),
            r#"{"id":"sa-persisted","label":"nas"}"#,
        )
        .unwrap();

        // An unroutable endpoint: any network attempt would fail the test.
        let client = CloudClient::new("http://127.0.0.1:9");
        let account = client.ensure_registered(&paths, TEST_PEM).await.unwrap();
        assert_eq!(account.id, "sa-persisted");
        assert_eq!(account.extra["label"], "nas");
    }

    #[tokio::test]
    async fn malformed_record_fails_with_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(&dir);
        std::fs::create_dir_all(paths.station_dir()).unwrap();
        std::fs::write(paths.service_account(), "{ this is not json").unwrap();

        let client = CloudClient::new("http://127.0.0.1:9");
        let result = client.ensure_registered(&paths, TEST_PEM).await;
        assert!(matches!(result, Err(RegistrationError::Parse(_))));
    }

    #[tokio::test]
    async fn registration_posts_the_public_key_and_persists_the_payload() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(&dir);
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/stations"))
            .and(body_partial_json(json!({ "publicKey": TEST_PEM })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": "sa-1", "secret": "opaque" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudClient::new(server.uri());
        let account = client.ensure_registered(&paths, TEST_PEM).await.unwrap();
        assert_eq!(account.id, "sa-1");

        // The record on disk is the cloud payload, verbatim.
        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(paths.service_account()).unwrap())
                .unwrap();
        assert_eq!(on_disk, json!({ "id": "sa-1", "secret": "opaque" }));

        // A second call is served from disk; expect(1) enforces that no
        // further request reaches the server.
        let again = client.ensure_registered(&paths, TEST_PEM).await.unwrap();
        assert_eq!(again, account);
    }

    #[tokio::test]
    async fn non_success_status_is_a_rejection_and_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(&dir);
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/stations"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = CloudClient::new(server.uri());
        let result = client.ensure_registered(&paths, TEST_PEM).await;
        assert!(matches!(
            result,
            Err(RegistrationError::Rejected(StatusCode::SERVICE_UNAVAILABLE))
        ));
        assert!(!paths.service_account().exists());
    }

    #[tokio::test]
    async fn lookup_sends_the_stored_token_as_authorization() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/users/u-42"))
            .and(header("Authorization", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": "u-42", "username": "alice" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudClient::new(server.uri());
        let user = client.lookup_user("u-42", "tok-1").await.unwrap();
        assert_eq!(user.id, "u-42");
        assert_eq!(user.extra["username"], "alice");
    }

    #[tokio::test]
    async fn lookup_rejection_carries_the_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/users/u-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = CloudClient::new(server.uri());
        let result = client.lookup_user("u-1", "bad-token").await;
        assert!(matches!(
            result,
            Err(RegistrationError::Rejected(StatusCode::UNAUTHORIZED))
        ));
    }

    #[test]
    fn trailing_slashes_are_normalized() {
        let client = CloudClient::new("https://cloud.example.io///");
        assert_eq!(client.base, "https://cloud.example.io");
    }
}
