//! Digest: a BLAKE3 content hash truncated to 128 bits (32 hex chars).
//!
//! Input is always fed to the hasher in fixed 8 KiB chunks, so memory use is
//! bounded no matter how large the file is. The digest only depends on the
//! bytes, never on how a caller happened to split them.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CasketError, Result};

/// Bytes fed to the hasher per read.
pub const CHUNK_SIZE: usize = 8192;

/// Length of a digest in hex characters.
pub const DIGEST_LEN: usize = 32;

/// A content digest - 128 bits (16 bytes, 32 hex chars) of BLAKE3.
///
/// Serialized as a bare string. Deserializing goes through
/// [`Digest::from_str_checked`], so every `Digest` has at least the four
/// hex chars [`Digest::shard`] slices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Hash an in-memory buffer.
    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for chunk in data.chunks(CHUNK_SIZE) {
            hasher.update(chunk);
        }
        Self::finish(hasher)
    }

    /// Stream a reader through the hasher until EOF.
    ///
    /// The error is the raw `io::Error`; [`Digest::from_file`] wraps it with
    /// the path.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(Self::finish(hasher))
    }

    /// Hash a file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CasketError::io("digest", path, e))?;
        let digest = Self::from_reader(file).map_err(|e| CasketError::io("digest", path, e))?;
        tracing::debug!(path = %path.display(), digest = %digest, "Digested file");
        Ok(digest)
    }

    fn finish(hasher: blake3::Hasher) -> Self {
        let hash = hasher.finalize();
        Self(hex::encode(&hash.as_bytes()[..DIGEST_LEN / 2]))
    }

    /// Create from an existing digest string (validates format).
    pub fn from_str_checked(s: &str) -> Result<Self> {
        if s.len() != DIGEST_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CasketError::InvalidDigest(s.to_string()));
        }
        Ok(Self(s.to_lowercase()))
    }

    /// The two 2-char shard segments: `digest[0..2]` and `digest[2..4]`.
    pub fn shard(&self) -> (&str, &str) {
        (&self.0[0..2], &self.0[2..4])
    }

    /// Get the full digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = CasketError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_checked(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = CasketError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_str_checked(&s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
