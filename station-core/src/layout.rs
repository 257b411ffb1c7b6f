//! Fixed on-disk layout under a device storage root.
//!
//! Everything the station subsystem persists lives in one subdirectory of
//! the root handed over by the file subsystem:
//!
//! ```text
//! <root>/station/
//! ├── station.pub.pem   # PEM (SPKI) RSA public key
//! ├── station.key.pem   # PEM (PKCS#8) RSA private key (0600)
//! └── account.json      # cloud-issued service-account record
//! ```

use std::path::{Path, PathBuf};

/// Subdirectory of the storage root owned by this subsystem.
pub const STATION_DIR: &str = "station";
/// Filename of the PEM public key.
pub const PUBLIC_KEY_FILE: &str = "station.pub.pem";
/// Filename of the PEM private key.
pub const PRIVATE_KEY_FILE: &str = "station.key.pem";
/// Filename of the persisted service-account record.
pub const ACCOUNT_FILE: &str = "account.json";

/// Resolved paths for one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationPaths {
    root: PathBuf,
}

impl StationPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/station/`
    pub fn station_dir(&self) -> PathBuf {
        self.root.join(STATION_DIR)
    }

    /// `<root>/station/station.pub.pem`
    pub fn public_key(&self) -> PathBuf {
        self.station_dir().join(PUBLIC_KEY_FILE)
    }

    /// `<root>/station/station.key.pem`
    pub fn private_key(&self) -> PathBuf {
        self.station_dir().join(PRIVATE_KEY_FILE)
    }

    /// `<root>/station/account.json`
    pub fn service_account(&self) -> PathBuf {
        self.station_dir().join(ACCOUNT_FILE)
    }
}
