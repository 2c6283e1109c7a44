//! Error taxonomy shared by every casket operation.
//!
//! Errors carry the operation name and the path involved so callers can log
//! them without extra context. Nothing in this crate retries.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by digesting, path derivation, archives and fetching.
#[derive(Debug, Error)]
pub enum CasketError {
    #[error("{op} failed on {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid digest {0:?}")]
    InvalidDigest(String),

    #[error("invalid {part} {value:?} in storage key")]
    InvalidKeyPart { part: &'static str, value: String },

    #[error("archive entry {entry:?} escapes destination {}", destination.display())]
    PathTraversal { entry: String, destination: PathBuf },

    #[error("unsupported format for {}: {message}", path.display())]
    UnsupportedFormat { path: PathBuf, message: String },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("store is in read-only mode")]
    ReadOnly,
}

impl CasketError {
    pub(crate) fn io(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn zip(path: impl AsRef<Path>, err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(source) => Self::io("zip", path, source),
            other => Self::UnsupportedFormat {
                path: path.as_ref().to_path_buf(),
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn http(url: &str, err: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// True when the error is a rejected archive entry.
    pub fn is_path_traversal(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }
}

pub type Result<T, E = CasketError> = std::result::Result<T, E>;
