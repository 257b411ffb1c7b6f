//! Runtime configuration.

use std::path::PathBuf;

/// Default cloud control-plane endpoint.
pub const DEFAULT_CLOUD_ENDPOINT: &str = "https://cloud.stationware.io";

/// Environment override for the cloud endpoint.
pub const CLOUD_ENDPOINT_ENV: &str = "STATION_CLOUD_ENDPOINT";

/// Environment override for the storage root.
pub const STORAGE_ROOT_ENV: &str = "STATION_ROOT";

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Base URL of the cloud control plane.
    pub cloud_endpoint: String,
    /// Device storage root; the subsystem owns `<root>/station/`.
    pub storage_root: PathBuf,
}

impl StationConfig {
    /// Resolve configuration. CLI flags win over environment variables,
    /// which win over the defaults (the platform data directory for the
    /// root, the production endpoint for the cloud).
    pub fn resolve(root: Option<PathBuf>, cloud_endpoint: Option<String>) -> Self {
        let cloud_endpoint = cloud_endpoint
            .or_else(|| std::env::var(CLOUD_ENDPOINT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CLOUD_ENDPOINT.to_string());

        let storage_root = root
            .or_else(|| std::env::var_os(STORAGE_ROOT_ENV).map(PathBuf::from))
            .unwrap_or_else(|| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("station-daemon")
            });

        Self {
            cloud_endpoint,
            storage_root,
        }
    }
}
