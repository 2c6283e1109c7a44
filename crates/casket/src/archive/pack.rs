//! Directory -> zip archive.

use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use chrono::{Datelike, Timelike};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{CasketError, Result};

/// Pack `source_dir` into a deflate-compressed zip at `archive_path`.
///
/// Entry names are relative to the parent of `source_dir`, so packing
/// `/data/photos` yields entries like `photos/a.jpg`. Only regular files are
/// written; directories are implied by the entry names and symlinks are
/// skipped. Each entry keeps the source file's modification time and unix
/// permission bits.
///
/// On error the archive file may be left half-written; removing it is up to
/// the caller. Returns the number of files written.
pub fn pack(source_dir: impl AsRef<Path>, archive_path: impl AsRef<Path>) -> Result<usize> {
    let source_dir = source_dir.as_ref();
    let archive_path = archive_path.as_ref();

    let root = fs::canonicalize(source_dir).map_err(|e| CasketError::io("pack", source_dir, e))?;
    if !root.is_dir() {
        return Err(CasketError::io(
            "pack",
            source_dir,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }
    let base = root.parent().unwrap_or(&root).to_path_buf();

    let out = File::create(archive_path).map_err(|e| CasketError::io("pack", archive_path, e))?;
    let own_archive =
        fs::canonicalize(archive_path).map_err(|e| CasketError::io("pack", archive_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let mut written = 0;

    for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&root).to_path_buf();
            CasketError::io("pack", path, e.into())
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                tracing::debug!(path = %path.display(), "Skipping symlink");
            }
            continue;
        }

        if path == own_archive.as_path() {
            tracing::debug!(path = %path.display(), "Skipping archive being written");
            continue;
        }

        let meta = entry.metadata().map_err(|e| CasketError::io("pack", path, e.into()))?;
        let name = entry_name(path.strip_prefix(&base).unwrap_or(path));

        zip.start_file(name, entry_options(&meta))
            .map_err(|e| CasketError::zip(archive_path, e))?;
        let mut src = File::open(path).map_err(|e| CasketError::io("pack", path, e))?;
        io::copy(&mut src, &mut zip).map_err(|e| CasketError::io("pack", path, e))?;
        written += 1;
    }

    zip.finish()
        .map_err(|e| CasketError::zip(archive_path, e))?
        .flush()
        .map_err(|e| CasketError::io("pack", archive_path, e))?;

    tracing::debug!(
        source = %root.display(),
        archive = %archive_path.display(),
        files = written,
        "Packed directory"
    );
    Ok(written)
}

/// Forward-slash entry name for a path relative to the archive base.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn entry_options(meta: &Metadata) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(meta.len() >= u32::MAX as u64);

    if let Some(time) = meta.modified().ok().and_then(zip_time) {
        options = options.last_modified_time(time);
    }
    if let Some(mode) = permissions(meta) {
        options = options.unix_permissions(mode);
    }
    options
}

/// Zip timestamps are local DOS times; anything before 1980 falls back to
/// the writer's default.
fn zip_time(modified: SystemTime) -> Option<zip::DateTime> {
    let local: chrono::DateTime<chrono::Local> = modified.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

#[cfg(unix)]
fn permissions(meta: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn permissions(_meta: &Metadata) -> Option<u32> {
    None
}
