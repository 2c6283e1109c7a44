//! Zip archive -> directory, refusing entries that escape the destination.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::guard::resolve_entry;
use crate::error::{CasketError, Result};

/// Extract `archive_path` under `destination` and return the destination.
///
/// With no destination (or an empty one) the archive is extracted into
/// [`default_destination`]. Every entry name goes through
/// [`resolve_entry`] first; the first entry that would land outside the
/// destination aborts with [`CasketError::PathTraversal`]. Entries written
/// before the failure stay on disk, so treat any error as "destination is
/// in an unknown state".
pub fn unpack(archive_path: impl AsRef<Path>, destination: Option<&Path>) -> Result<PathBuf> {
    let archive_path = archive_path.as_ref();
    let destination = match destination {
        Some(dest) if !dest.as_os_str().is_empty() => dest.to_path_buf(),
        _ => default_destination(archive_path),
    };

    let file = File::open(archive_path).map_err(|e| CasketError::io("unpack", archive_path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| CasketError::zip(archive_path, e))?;

    fs::create_dir_all(&destination).map_err(|e| CasketError::io("unpack", &destination, e))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| CasketError::zip(archive_path, e))?;
        let out_path = resolve_entry(&destination, entry.name())?;

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| CasketError::io("unpack", &out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CasketError::io("unpack", parent, e))?;
        }

        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&out_path)
            .map_err(|e| CasketError::io("unpack", &out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| CasketError::io("unpack", &out_path, e))?;

        if let Some(mode) = entry.unix_mode() {
            apply_mode(&out_path, mode)?;
        }
    }

    tracing::debug!(
        archive = %archive_path.display(),
        destination = %destination.display(),
        entries = archive.len(),
        "Unpacked archive"
    );
    Ok(destination)
}

/// `temp_dir()/<archive file name without .zip>`.
pub fn default_destination(archive_path: &Path) -> PathBuf {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".zip").unwrap_or(&name);
    let stem = if stem.is_empty() { "archive" } else { stem };
    std::env::temp_dir().join(stem)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = mode & 0o7777;
    if mode == 0 {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| CasketError::io("unpack", path, e))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
