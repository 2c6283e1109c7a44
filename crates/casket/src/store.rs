//! LocalStore: places content under the local upload root by storage key.
//!
//! Layout:
//! ```text
//! {upload_root}/
//! └── {env_tag}/
//!     ├── ab/
//!     │   └── cd/
//!     │       └── abcd1234....jpg
//!     └── 12/
//!         └── 34/
//!             └── 1234abcd....pdf
//! ```
//!
//! Objects are write-once: the path is derived from the content, so a second
//! write of the same bytes finds the file already there and skips the copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::StoreConfig;
use crate::digest::Digest;
use crate::error::{CasketError, Result};
use crate::layout::{check_env_tag, file_extension, key_for_bytes, key_for_file, StorageKey};

/// Where a piece of content ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub digest: Digest,
    pub key: StorageKey,
    pub local_path: PathBuf,
    pub size_bytes: u64,
}

/// Filesystem-backed store rooted at the configured upload root.
#[derive(Debug, Clone)]
pub struct LocalStore {
    config: StoreConfig,
}

impl LocalStore {
    /// Create a new LocalStore with the given configuration.
    ///
    /// Creates the upload root if it doesn't exist (unless in read-only mode).
    /// Fails with [`CasketError::InvalidKeyPart`] when the environment tag
    /// could not be used as a single path segment.
    pub fn new(config: StoreConfig) -> Result<Self> {
        check_env_tag(&config.env_tag)?;
        if !config.read_only {
            fs::create_dir_all(&config.upload_root)
                .map_err(|e| CasketError::io("create store", &config.upload_root, e))?;
        }
        Ok(Self { config })
    }

    /// Create a LocalStore at a specific path.
    pub fn at_path(env_tag: &str, path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::with_upload_root(env_tag, path))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Derive a key for `digest` in this store's environment.
    pub fn key(&self, digest: &Digest, extension: &str) -> Result<StorageKey> {
        crate::layout::derive_path(digest.as_str(), extension, &self.config.env_tag)
    }

    /// Copy a local file into the store, keyed by its content and extension.
    pub fn put_file(&self, src: impl AsRef<Path>) -> Result<StoredObject> {
        self.ensure_writable()?;
        let src = src.as_ref();
        let (digest, key) = key_for_file(src, &self.config.env_tag)?;
        let dest = key.local_path(&self.config.upload_root);

        self.ensure_parent(&key)?;
        if !dest.exists() {
            fs::copy(src, &dest).map_err(|e| CasketError::io("store", &dest, e))?;
            tracing::debug!(src = %src.display(), key = %key.file_name, "Stored file");
        }

        let size_bytes = fs::metadata(&dest)
            .map_err(|e| CasketError::io("store", &dest, e))?
            .len();
        Ok(StoredObject {
            digest,
            key,
            local_path: dest,
            size_bytes,
        })
    }

    /// Write an in-memory upload into the store.
    pub fn put_bytes(&self, data: &[u8], extension: &str) -> Result<StoredObject> {
        self.ensure_writable()?;
        let (digest, key) = key_for_bytes(data, extension, &self.config.env_tag)?;
        let dest = key.local_path(&self.config.upload_root);

        self.ensure_parent(&key)?;
        if !dest.exists() {
            fs::write(&dest, data).map_err(|e| CasketError::io("store", &dest, e))?;
            tracing::debug!(key = %key.file_name, bytes = data.len(), "Stored upload");
        }

        Ok(StoredObject {
            digest,
            key,
            local_path: dest,
            size_bytes: data.len() as u64,
        })
    }

    /// Local path for a key, if the object exists.
    pub fn path(&self, key: &StorageKey) -> Option<PathBuf> {
        let path = key.local_path(&self.config.upload_root);
        path.exists().then_some(path)
    }

    pub fn exists(&self, key: &StorageKey) -> bool {
        self.path(key).is_some()
    }

    /// Read an object's bytes, `None` if it isn't stored.
    pub fn retrieve(&self, key: &StorageKey) -> Result<Option<Vec<u8>>> {
        let path = key.local_path(&self.config.upload_root);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CasketError::io("retrieve", &path, e)),
        }
    }

    /// Delete a file, warning when it's already gone.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_writable()?;
        let path = path.as_ref();
        if let Err(e) = fs::metadata(path) {
            tracing::warn!(path = %path.display(), "File does not exist");
            return Err(CasketError::io("remove", path, e));
        }
        fs::remove_file(path).map_err(|e| CasketError::io("remove", path, e))
    }

    /// Store an upload whose extension comes from its original file name.
    pub fn put_named_bytes(&self, data: &[u8], filename: &str) -> Result<StoredObject> {
        self.put_bytes(data, file_extension(filename))
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.config.read_only {
            return Err(CasketError::ReadOnly);
        }
        Ok(())
    }

    fn ensure_parent(&self, key: &StorageKey) -> Result<()> {
        let dir = key.local_dir(&self.config.upload_root);
        fs::create_dir_all(&dir).map_err(|e| CasketError::io("store", &dir, e))
    }
}
