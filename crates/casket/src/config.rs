//! Store configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `CASKET_ENV`: Environment tag used as the first path segment (default `dev`)
//! - `CASKET_UPLOAD_ROOT`: Local directory storage keys are placed under
//! - `CASKET_TEMP_ROOT`: Directory for downloads (default: system temp dir)
//! - `CASKET_FETCH_TIMEOUT`: HTTP timeout in seconds (default 60)
//! - `CASKET_READONLY`: Set to "true" for read-only mode
//!
//! Default upload root: `~/.casket/upload`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for local content storage and fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Environment tag, e.g. "dev" or "prod". Keeps trees from different
    /// environments apart even when they share a bucket or disk.
    #[serde(default = "default_env_tag")]
    pub env_tag: String,

    /// Local directory that storage keys are resolved under.
    #[serde(default = "default_upload_root")]
    pub upload_root: PathBuf,

    /// Where the fetcher drops downloads.
    #[serde(default = "std::env::temp_dir")]
    pub temp_root: PathBuf,

    /// HTTP timeout for fetches, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Read-only mode - prevents any writes through [`crate::LocalStore`].
    #[serde(default)]
    pub read_only: bool,

    /// File holding the deployed build's revision hash.
    #[serde(default = "default_revision_file")]
    pub revision_file: PathBuf,
}

fn default_env_tag() -> String {
    "dev".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_revision_file() -> PathBuf {
    PathBuf::from("conf/git-rev-hash")
}

/// Get the default upload root (~/.casket/upload).
fn default_upload_root() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".casket").join("upload"))
        .unwrap_or_else(|| PathBuf::from(".casket/upload"))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            env_tag: default_env_tag(),
            upload_root: default_upload_root(),
            temp_root: env::temp_dir(),
            fetch_timeout_secs: default_timeout_secs(),
            read_only: false,
            revision_file: default_revision_file(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(tag) = env::var("CASKET_ENV") {
            if !tag.is_empty() {
                config.env_tag = tag;
            }
        }
        if let Ok(root) = env::var("CASKET_UPLOAD_ROOT") {
            config.upload_root = PathBuf::from(root);
        }
        if let Ok(root) = env::var("CASKET_TEMP_ROOT") {
            config.temp_root = PathBuf::from(root);
        }
        if let Ok(secs) = env::var("CASKET_FETCH_TIMEOUT") {
            config.fetch_timeout_secs = secs
                .parse()
                .with_context(|| format!("CASKET_FETCH_TIMEOUT is not a number: {secs}"))?;
        }
        config.read_only = env::var("CASKET_READONLY")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[storage]` section:
    /// ```toml
    /// [storage]
    /// env_tag = "prod"
    /// upload_root = "/srv/upload"
    /// fetch_timeout_secs = 30
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(section) = table.get("storage") {
            let config: StoreConfig = section
                .clone()
                .try_into()
                .context("failed to parse [storage] section")?;
            Ok(config)
        } else {
            Self::from_env()
        }
    }

    /// Create a config with a specific environment tag and upload root.
    pub fn with_upload_root(env_tag: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            env_tag: env_tag.into(),
            upload_root: path.into(),
            ..Self::default()
        }
    }

    /// Create a read-only config at a specific upload root.
    pub fn read_only(env_tag: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            read_only: true,
            ..Self::with_upload_root(env_tag, path)
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// True for the production tree.
    pub fn is_production(&self) -> bool {
        matches!(self.env_tag.as_str(), "prod" | "production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.env_tag, "dev");
        assert!(config.upload_root.to_string_lossy().contains(".casket"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(60));
        assert!(!config.read_only);
        assert!(!config.is_production());
    }

    #[test]
    fn test_from_env() {
        // One test owns every CASKET_* variable so parallel tests can't interleave.
        for var in [
            "CASKET_ENV",
            "CASKET_UPLOAD_ROOT",
            "CASKET_TEMP_ROOT",
            "CASKET_FETCH_TIMEOUT",
            "CASKET_READONLY",
        ] {
            env::remove_var(var);
        }

        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.env_tag, "dev");
        assert!(config.upload_root.to_string_lossy().contains(".casket"));
        assert_eq!(config.fetch_timeout_secs, 60);
        assert!(!config.read_only);

        env::set_var("CASKET_ENV", "prod");
        env::set_var("CASKET_UPLOAD_ROOT", "/srv/upload");
        env::set_var("CASKET_TEMP_ROOT", "/var/tmp/casket");
        env::set_var("CASKET_FETCH_TIMEOUT", "15");
        env::set_var("CASKET_READONLY", "TRUE");
        let config = StoreConfig::from_env().unwrap();
        assert!(config.is_production());
        assert_eq!(config.upload_root, PathBuf::from("/srv/upload"));
        assert_eq!(config.temp_root, PathBuf::from("/var/tmp/casket"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert!(config.read_only);

        env::set_var("CASKET_FETCH_TIMEOUT", "soon");
        let err = StoreConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("CASKET_FETCH_TIMEOUT is not a number"));

        for var in [
            "CASKET_ENV",
            "CASKET_UPLOAD_ROOT",
            "CASKET_TEMP_ROOT",
            "CASKET_FETCH_TIMEOUT",
            "CASKET_READONLY",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_with_upload_root() {
        let config = StoreConfig::with_upload_root("prod", "/srv/upload");
        assert_eq!(config.upload_root, PathBuf::from("/srv/upload"));
        assert!(config.is_production());
        assert!(!config.read_only);
    }

    #[test]
    fn test_read_only_config() {
        let config = StoreConfig::read_only("dev", "/srv/upload");
        assert!(config.read_only);
        assert_eq!(config.env_tag, "dev");
    }

    #[test]
    fn test_from_file_storage_section() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("casket.toml");
        std::fs::write(
            &path,
            "[storage]\nenv_tag = \"staging\"\nupload_root = \"/srv/up\"\nfetch_timeout_secs = 5\n",
        )?;

        let config = StoreConfig::from_file(&path)?;
        assert_eq!(config.env_tag, "staging");
        assert_eq!(config.upload_root, PathBuf::from("/srv/up"));
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.revision_file, PathBuf::from("conf/git-rev-hash"));
        Ok(())
    }

    #[test]
    fn test_from_file_bad_toml() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "[storage\nenv_tag = ")?;

        let err = StoreConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse TOML"));
        Ok(())
    }

    #[test]
    fn test_from_file_missing() {
        let err = StoreConfig::from_file(Path::new("/no/such/casket.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = StoreConfig::with_upload_root("prod", "/custom/upload");
        let json = serde_json::to_string(&config).unwrap();
        let restored: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.env_tag, restored.env_tag);
        assert_eq!(config.upload_root, restored.upload_root);
        assert_eq!(config.fetch_timeout_secs, restored.fetch_timeout_secs);
    }
}
