//! Download a remote resource into a local temp path.
//!
//! There is no retry and no integrity check; run the result through
//! [`crate::Digest::from_file`] if the content must be verified.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::resolve_entry;
use crate::config::StoreConfig;
use crate::digest::CHUNK_SIZE;
use crate::error::{CasketError, Result};
use crate::http::HttpClient;

/// Fetches URLs into files under a temp root.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: HttpClient,
    temp_root: PathBuf,
}

impl Fetcher {
    pub fn new(temp_root: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(timeout)?,
            temp_root: temp_root.into(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(config.temp_root.clone(), config.fetch_timeout())
    }

    /// GET `url` and stream the body to `temp_root/<hint>`.
    ///
    /// The hint is resolved like an archive entry, so `../x` or an absolute
    /// path is rejected with [`CasketError::PathTraversal`] before any
    /// request is made. An existing file at the target is overwritten.
    ///
    /// A body that breaks off mid-stream is [`CasketError::Http`]; a failed
    /// local write is [`CasketError::Io`]. Either way the partial file is
    /// removed.
    pub fn fetch(&self, url: &str, hint: &str) -> Result<PathBuf> {
        let local = resolve_entry(&self.temp_root, hint)?;
        let mut response = self.http.get_stream(url)?;

        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| CasketError::io("fetch", parent, e))?;
        }
        let file = File::create(&local).map_err(|e| CasketError::io("fetch", &local, e))?;

        match stream_body(&mut response, BufWriter::new(file), url, &local) {
            Ok(bytes) => {
                tracing::debug!(url, path = %local.display(), bytes, "Fetched remote file");
                Ok(local)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&local) {
                    tracing::warn!(path = %local.display(), error = %rm, "Failed to remove partial download");
                }
                Err(e)
            }
        }
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }
}

/// Copy `body` into `out` chunk by chunk, keeping read and write failures apart.
fn stream_body<R: Read, W: Write>(
    body: &mut R,
    mut out: W,
    url: &str,
    local: &Path,
) -> Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(CasketError::Http {
                    url: url.to_string(),
                    message: format!("body read failed after {total} bytes: {e}"),
                })
            }
        };
        out.write_all(&buf[..n])
            .map_err(|e| CasketError::io("fetch", local, e))?;
        total += n as u64;
    }
    out.flush().map_err(|e| CasketError::io("fetch", local, e))?;
    Ok(total)
}
