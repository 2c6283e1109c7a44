//! Build revision lookup.
//!
//! Deployments drop the git revision hash into a small file next to the
//! binary's config. The value is read once on first use and cached in the
//! owning [`Revision`]; callers keep one per process (typically next to
//! their [`crate::StoreConfig`]) and hand out references.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::StoreConfig;

/// Bytes read from the revision file. A full git SHA-1 is 40 hex chars; the
/// short form used in paths and logs is 32.
const REVISION_LEN: u64 = 32;

/// Reported when the revision file can't be used.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Lazily loaded build revision.
#[derive(Debug)]
pub struct Revision {
    path: PathBuf,
    value: OnceLock<String>,
}

impl Revision {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            value: OnceLock::new(),
        }
    }

    /// Revision read from the configured `revision_file`.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.revision_file.clone())
    }

    /// A revision that is already known, e.g. baked in at compile time.
    pub fn fixed(value: impl Into<String>) -> Self {
        let revision = Self::new(PathBuf::new());
        let _ = revision.value.set(value.into());
        revision
    }

    /// The revision, reading the file on first call.
    pub fn get(&self) -> &str {
        self.value.get_or_init(|| read_revision(&self.path))
    }

    /// True once the file has been read (or the value was fixed).
    pub fn is_loaded(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_revision(path: &Path) -> String {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Revision file unavailable");
            return UNKNOWN_REVISION.to_string();
        }
    };

    let mut buf = Vec::with_capacity(REVISION_LEN as usize);
    if let Err(e) = (&mut file).take(REVISION_LEN).read_to_end(&mut buf) {
        tracing::error!(path = %path.display(), error = %e, "Revision file unreadable");
        return UNKNOWN_REVISION.to_string();
    }

    let value = String::from_utf8_lossy(&buf).trim().to_string();
    if value.is_empty() {
        tracing::error!(path = %path.display(), "Revision file is empty");
        return UNKNOWN_REVISION.to_string();
    }
    value
}
