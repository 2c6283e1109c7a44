//! Path derivation: digest + extension + environment tag -> storage key.
//!
//! Layout:
//! ```text
//! {env_tag}/
//! ├── ab/
//! │   └── cd/
//! │       └── abcdef1234....png
//! └── 12/
//!     └── 34/
//!         └── 123456789a....pdf
//! ```
//!
//! Deriving a key never touches the filesystem. Turning a key into a local
//! path is a separate step ([`StorageKey::local_dir`]) that needs the
//! configured upload root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::{CasketError, Result};

/// Where a piece of content lives, relative to a storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    /// `env/xx/yy`, always three segments.
    pub shard_dir: String,
    /// `env/xx/yy/digest.ext`.
    pub file_name: String,
}

/// Derive the storage key for a digest.
///
/// `extension` may carry leading dots; they are stripped and exactly one is
/// put back. An empty extension produces a bare `digest` file name. What
/// remains must be ASCII alphanumerics, `-`, `_` or `+`, and the environment
/// tag must pass [`check_env_tag`], so a key always has exactly four
/// segments.
pub fn derive_path(digest: &str, extension: &str, env_tag: &str) -> Result<StorageKey> {
    check_env_tag(env_tag)?;
    let shard = digest
        .get(0..4)
        .filter(|s| s.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| CasketError::InvalidDigest(digest.to_string()))?;

    let extension = extension.trim_start_matches('.');
    if !extension.chars().all(is_extension_char) {
        return Err(CasketError::InvalidKeyPart {
            part: "extension",
            value: extension.to_string(),
        });
    }

    let shard_dir = format!("{}/{}/{}", env_tag, &shard[0..2], &shard[2..4]);
    let file_name = if extension.is_empty() {
        format!("{}/{}", shard_dir, digest)
    } else {
        format!("{}/{}.{}", shard_dir, digest, extension)
    };

    Ok(StorageKey {
        shard_dir,
        file_name,
    })
}

/// Reject environment tags that would add, drop or escape a path segment.
pub fn check_env_tag(env_tag: &str) -> Result<()> {
    let bad = env_tag.is_empty()
        || env_tag == "."
        || env_tag == ".."
        || env_tag.contains(['/', '\\']);
    if bad {
        return Err(CasketError::InvalidKeyPart {
            part: "environment tag",
            value: env_tag.to_string(),
        });
    }
    Ok(())
}

fn is_extension_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')
}

/// The text after the last `.` in a file name, or empty when there is none.
///
/// Only the final path component is considered, so `a.d/readme` has no
/// extension.
pub fn file_extension(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// Digest a file and derive its key, taking the extension from its name.
pub fn key_for_file(path: impl AsRef<Path>, env_tag: &str) -> Result<(Digest, StorageKey)> {
    let path = path.as_ref();
    let digest = Digest::from_file(path)?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let key = derive_path(digest.as_str(), file_extension(name), env_tag)?;
    Ok((digest, key))
}

/// Digest an upload buffer and derive its key with a caller-chosen extension.
pub fn key_for_bytes(data: &[u8], extension: &str, env_tag: &str) -> Result<(Digest, StorageKey)> {
    let digest = Digest::from_data(data);
    let key = derive_path(digest.as_str(), extension, env_tag)?;
    Ok((digest, key))
}

impl StorageKey {
    /// Directory for this key under a local upload root.
    pub fn local_dir(&self, upload_root: &Path) -> PathBuf {
        upload_root.join(&self.shard_dir)
    }

    /// Full local file path for this key under a local upload root.
    pub fn local_path(&self, upload_root: &Path) -> PathBuf {
        upload_root.join(&self.file_name)
    }

    /// The shard directory split into its three segments.
    pub fn segments(&self) -> Vec<&str> {
        self.shard_dir.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_sharded_key() {
        let key = derive_path("abcdef1234", ".png", "dev").unwrap();
        assert_eq!(key.shard_dir, "dev/ab/cd");
        assert_eq!(key.file_name, "dev/ab/cd/abcdef1234.png");
    }

    #[test]
    fn test_extension_with_or_without_dot() {
        let dotted = derive_path("abcdef1234", ".png", "dev").unwrap();
        let bare = derive_path("abcdef1234", "png", "dev").unwrap();
        let doubled = derive_path("abcdef1234", "..png", "dev").unwrap();
        assert_eq!(dotted, bare);
        assert_eq!(dotted, doubled);
    }

    #[test]
    fn test_empty_extension() {
        let key = derive_path("abcdef1234", "", "prod").unwrap();
        assert_eq!(key.file_name, "prod/ab/cd/abcdef1234");
    }

    #[test]
    fn test_short_digest_rejected() {
        for digest in ["", "a", "abc"] {
            assert!(matches!(
                derive_path(digest, "png", "dev"),
                Err(CasketError::InvalidDigest(_))
            ));
        }
    }

    #[test]
    fn test_non_hex_shard_rejected() {
        assert!(derive_path("../x1234", "png", "dev").is_err());
        assert!(derive_path("zzzz", "png", "dev").is_err());
    }

    #[test]
    fn test_multibyte_prefix_rejected_without_panic() {
        assert!(derive_path("é1234", "png", "dev").is_err());
    }

    #[test]
    fn test_bad_env_tag_rejected() {
        for env in ["", ".", "..", "a/b", "/abs", "a\\b"] {
            let err = derive_path("abcdef1234", "png", env).unwrap_err();
            assert!(
                matches!(err, CasketError::InvalidKeyPart { part: "environment tag", .. }),
                "{env:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_env_tag_with_dots_inside_is_allowed() {
        let key = derive_path("abcdef1234", "png", "eu.prod").unwrap();
        assert_eq!(key.segments(), vec!["eu.prod", "ab", "cd"]);
    }

    #[test]
    fn test_extension_cannot_add_segments() {
        for ext in ["x/../../../../../etc/cron.d/job", "a/b", "a\\b", "tar.gz", "p ng"] {
            let result = derive_path("abcdef1234", ext, "dev");
            assert!(
                matches!(result, Err(CasketError::InvalidKeyPart { part: "extension", .. })),
                "{ext:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_extension_charset() {
        let key = derive_path("abcdef1234", "c++", "dev").unwrap();
        assert_eq!(key.file_name, "dev/ab/cd/abcdef1234.c++");
        assert!(derive_path("abcdef1234", "tar_gz-v2", "dev").is_ok());
    }

    #[test]
    fn test_segments() {
        let key = derive_path("0123456789", "txt", "staging").unwrap();
        assert_eq!(key.segments(), vec!["staging", "01", "23"]);
    }

    #[test]
    fn test_local_paths() {
        let key = derive_path("abcdef1234", "png", "dev").unwrap();
        let root = Path::new("/srv/upload");
        assert_eq!(key.local_dir(root), PathBuf::from("/srv/upload/dev/ab/cd"));
        assert_eq!(
            key.local_path(root),
            PathBuf::from("/srv/upload/dev/ab/cd/abcdef1234.png")
        );
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), "JPG");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension("dir.d/README"), "");
        assert_eq!(file_extension(".bashrc"), "bashrc");
    }

    #[test]
    fn test_key_for_bytes() {
        let (digest, key) = key_for_bytes(b"upload", "gif", "dev").unwrap();
        assert!(key.file_name.ends_with(&format!("{}.gif", digest)));
        let (a, b) = digest.shard();
        assert_eq!(key.shard_dir, format!("dev/{}/{}", a, b));
    }

    #[test]
    fn test_key_for_file() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.7")?;

        let (digest, key) = key_for_file(&path, "dev")?;
        assert_eq!(digest, Digest::from_data(b"%PDF-1.7"));
        assert!(key.file_name.ends_with(".pdf"));
        Ok(())
    }
}
