//! Durable device key identity.
//!
//! `ensure_keys` either loads the existing keypair from the fixed paths or
//! generates and persists a fresh one. Presence is the only criterion for
//! reuse: a present-but-corrupt key file is returned unchanged. Generation
//! stages both PEM files and publishes them with atomic renames, so a crash
//! can never leave the device with half an identity.

use std::io;
use std::path::{Path, PathBuf};

use rsa::{RsaPrivateKey, RsaPublicKey};
use station_core::{StationIdentity, StationPaths};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// RSA modulus size for the device identity.
const KEY_BITS: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// Filesystem failure other than a missing key file. Fatal; the caller
    /// must not retry automatically.
    #[error("key storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Keypair generation or PEM encoding failed. Fatal.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
}

/// Load the device keypair from `<root>/station/`, generating and persisting
/// a new one if either key file is missing.
///
/// The caller must hold no concurrent call for the same root.
///
/// # Errors
///
/// Missing key files are not an error — they trigger generation. Every other
/// filesystem failure during probing is propagated unchanged, and any
/// failure during generation is fatal.
pub async fn ensure_keys(paths: &StationPaths) -> Result<StationIdentity, KeyStoreError> {
    let public_key_path = paths.public_key();
    let private_key_path = paths.private_key();

    if is_regular_file(&public_key_path).await? && is_regular_file(&private_key_path).await? {
        let public_key_pem = fs::read_to_string(&public_key_path).await?;
        let private_key_pem = fs::read_to_string(&private_key_path).await?;
        tracing::debug!(path = %public_key_path.display(), "loaded existing station keys");
        return Ok(StationIdentity {
            public_key_pem,
            private_key_pem,
            public_key_path,
            private_key_path,
        });
    }

    create_keys(paths).await
}

async fn create_keys(paths: &StationPaths) -> Result<StationIdentity, KeyStoreError> {
    tracing::info!(dir = %paths.station_dir().display(), "generating station keypair");

    // Prime search is CPU-bound; keep it off the lifecycle worker.
    let (public_key_pem, private_key_pem) = tokio::task::spawn_blocking(generate_keypair_pem)
        .await
        .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))??;

    fs::create_dir_all(paths.station_dir()).await?;

    let public_key_path = paths.public_key();
    let private_key_path = paths.private_key();

    // Stage both files and sync them before either rename: existing key
    // material is only ever replaced by a fully durable successor.
    let private_staged = staging_path(&private_key_path);
    let public_staged = staging_path(&public_key_path);
    write_durable(&private_staged, private_key_pem.as_bytes()).await?;
    restrict_permissions(&private_staged)?;
    write_durable(&public_staged, public_key_pem.as_bytes()).await?;

    publish(&private_staged, &private_key_path).await?;
    publish(&public_staged, &public_key_path).await?;

    tracing::info!("station keypair created");
    Ok(StationIdentity {
        public_key_pem,
        private_key_pem,
        public_key_path,
        private_key_path,
    })
}

/// Generate a fresh RSA keypair and return `(public_pem, private_pem)`.
fn generate_keypair_pem() -> Result<(String, String), KeyStoreError> {
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?
        .to_string();
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;

    Ok((public_pem, private_pem))
}

/// Probe a key path without following symlinks. Missing is `Ok(false)`;
/// anything present that is not a regular file also reads as `false` and
/// triggers regeneration.
async fn is_regular_file(path: &Path) -> Result<bool, KeyStoreError> {
    match fs::symlink_metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(KeyStoreError::Io(e)),
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_durable(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    Ok(())
}

/// Move a staged file into place. `rename` replaces a regular file in one
/// step; a directory squatting on the fixed name is removed first.
async fn publish(staged: &Path, target: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::symlink_metadata(target).await {
        if meta.is_dir() {
            fs::remove_dir_all(target).await?;
        }
    }
    fs::rename(staged, target).await
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
