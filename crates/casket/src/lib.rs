//! Content addressed file storage and safe zip archives.
//!
//! Content is named by what it contains: a chunk-streamed BLAKE3 digest is
//! turned into a sharded path under an environment tag, and that path is
//! where the bytes live, either on local disk or as an object storage key.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use casket::{derive_path, Digest, LocalStore, StoreConfig};
//!
//! // Digest a file without loading it into memory
//! let digest = Digest::from_file("photo.jpg").unwrap();
//!
//! // Derive its storage key: dev/ab/cd/abcd....jpg
//! let key = derive_path(digest.as_str(), "jpg", "dev").unwrap();
//! println!("upload to {}", key.file_name);
//!
//! // Or place it under a local upload root in one step
//! let store = LocalStore::new(StoreConfig::from_env().unwrap()).unwrap();
//! let stored = store.put_file("photo.jpg").unwrap();
//! println!("stored at {}", stored.local_path.display());
//! ```
//!
//! # Archives
//!
//! ```rust,no_run
//! casket::archive::pack("/data/photos", "/tmp/photos.zip").unwrap();
//! let out = casket::archive::unpack("/tmp/photos.zip", None).unwrap();
//! assert!(out.join("photos").is_dir());
//! ```
//!
//! Unpacking rejects any entry whose name resolves outside the destination
//! (`../../evil`, `/etc/passwd`) with [`CasketError::PathTraversal`].
//!
//! # Concurrency
//!
//! Everything here is synchronous and stateless apart from file handles
//! scoped to a single call. Disjoint files and directories can be processed
//! from many threads at once; two unpacks into the same destination race
//! file by file.

pub mod archive;
pub mod config;
pub mod digest;
pub mod error;
pub mod fetch;
pub mod http;
pub mod layout;
pub mod revision;
pub mod sniff;
pub mod store;

// Re-exports for convenience
pub use config::StoreConfig;
pub use digest::{Digest, CHUNK_SIZE};
pub use error::{CasketError, Result};
pub use fetch::Fetcher;
pub use http::{FormPart, HttpClient, HttpResponse, Method, RequestBody};
pub use layout::{check_env_tag, derive_path, file_extension, key_for_bytes, key_for_file, StorageKey};
pub use revision::Revision;
pub use sniff::{sniff, sniff_file, upload_extension, ExtensionPolicy, FileKind, Sniffed};
pub use store::{LocalStore, StoredObject};
