//! Key provisioning: load the RSA keypair from disk, or generate and
//! persist one on first use.
//!
//! The private key lives as PKCS#8 PEM in `adbkey`, with the device-format
//! public blob beside it in `adbkey.pub`. A device only stays authorized
//! for a key it has seen, so the pair is generated once and reused for the
//! life of the installation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protocol::KeyMaterial;
use tracing::{debug, info};

/// File name of the PEM-encoded private key.
pub const PRIVATE_KEY_FILE: &str = "adbkey";

/// File name of the public key blob.
pub const PUBLIC_KEY_FILE: &str = "adbkey.pub";

/// Loads or creates the persistent keypair in a directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
    name: String,
}

impl KeyStore {
    /// A key store rooted at `dir` with the default key name.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            name: protocol::DEFAULT_KEY_NAME.to_string(),
        }
    }

    /// A key store rooted at `dir` with a custom identifying name for the
    /// public blob.
    pub fn with_name(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// The default key directory under the platform data directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("adbshell")
    }

    /// A key store in the default directory.
    pub fn in_default_dir() -> Self {
        Self::new(Self::default_dir())
    }

    /// Path of the private key file.
    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Loads the keypair if present, otherwise generates one and persists
    /// both halves.
    ///
    /// A freshly generated key is unknown to every device; the first
    /// connection with it triggers the on-device authorization dialog.
    pub fn load_or_generate(&self) -> Result<KeyMaterial> {
        let private_path = self.private_key_path();

        if private_path.exists() {
            let pem = fs::read_to_string(&private_path).with_context(|| {
                format!("Failed to read private key: {}", private_path.display())
            })?;
            let keys = KeyMaterial::from_pkcs8_pem(&pem, &self.name).with_context(|| {
                format!("Failed to parse private key: {}", private_path.display())
            })?;
            debug!("loaded keypair from {:?}", self.dir);
            return Ok(keys);
        }

        info!("no keypair found, generating a new one in {:?}", self.dir);
        let keys = KeyMaterial::generate_named(&self.name).context("Key generation failed")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create key directory: {}", self.dir.display()))?;

        let pem = keys.to_pkcs8_pem().context("Failed to encode private key")?;
        fs::write(&private_path, pem).with_context(|| {
            format!("Failed to write private key: {}", private_path.display())
        })?;
        restrict_permissions(&private_path)?;

        let public_path = self.public_key_path();
        fs::write(&public_path, keys.public_key_blob()).with_context(|| {
            format!("Failed to write public key: {}", public_path.display())
        })?;

        Ok(keys)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions: {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use tempfile::TempDir;

    /// Key generation is expensive; most tests reuse one generated store,
    /// seeding fresh directories from its PEM to exercise the load path.
    fn shared_store() -> &'static (TempDir, KeyStore) {
        static STORE: OnceLock<(TempDir, KeyStore)> = OnceLock::new();
        STORE.get_or_init(|| {
            let dir = TempDir::new().unwrap();
            let store = KeyStore::new(dir.path());
            store.load_or_generate().unwrap();
            (dir, store)
        })
    }

    fn seed_from_shared(dir: &Path) -> PathBuf {
        let (_, store) = shared_store();
        fs::create_dir_all(dir).unwrap();
        let pem = fs::read(store.private_key_path()).unwrap();
        let path = dir.join(PRIVATE_KEY_FILE);
        fs::write(&path, pem).unwrap();
        path
    }

    #[test]
    fn test_generate_then_reload_same_key() {
        let (_, store) = shared_store();
        assert!(store.private_key_path().exists());
        assert!(store.public_key_path().exists());

        let first = store.load_or_generate().unwrap();
        let second = store.load_or_generate().unwrap();
        assert_eq!(first.public_key_blob(), second.public_key_blob());
        assert_eq!(
            first.sign(b"probe").unwrap(),
            second.sign(b"probe").unwrap()
        );
    }

    #[test]
    fn test_public_file_matches_blob() {
        let (_, store) = shared_store();
        let keys = store.load_or_generate().unwrap();
        let on_disk = fs::read(store.public_key_path()).unwrap();
        assert_eq!(on_disk, keys.public_key_blob());
    }

    #[test]
    fn test_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join("deep").join("keys"));
        store.load_or_generate().unwrap();
        assert!(store.private_key_path().exists());
        assert!(store.public_key_path().exists());
    }

    #[test]
    fn test_custom_name_reaches_blob() {
        let dir = TempDir::new().unwrap();
        seed_from_shared(dir.path());

        let store = KeyStore::with_name(dir.path(), "rig@garage");
        let keys = store.load_or_generate().unwrap();

        let blob = keys.public_key_blob();
        let text = std::str::from_utf8(&blob[..blob.len() - 1]).unwrap();
        assert!(text.ends_with(" rig@garage"));
    }

    #[test]
    fn test_corrupt_private_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.private_key_path(), "garbage").unwrap();

        assert!(store.load_or_generate().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_, store) = shared_store();
        let mode = fs::metadata(store.private_key_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
