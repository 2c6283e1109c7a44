//! Type sniffing from leading magic bytes.
//!
//! Only the first [`SNIFF_LEN`] bytes are ever looked at. A buffer that
//! matches no signature is [`Sniffed::Unknown`], which is a normal answer and
//! not an error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CasketError, Result};
use crate::layout::file_extension;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// A recognized file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileKind {
    pub extension: &'static str,
    pub mime: &'static str,
}

/// Outcome of sniffing a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniffed {
    Known(FileKind),
    Unknown,
}

impl Sniffed {
    pub fn kind(&self) -> Option<FileKind> {
        match self {
            Sniffed::Known(kind) => Some(*kind),
            Sniffed::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Sniffed::Known(_))
    }
}

/// Whether ambiguous containers may borrow the uploaded file name's suffix.
///
/// Generic binary and zip content can't be told apart by magic bytes (docx,
/// apk and jar are all zip), so [`ExtensionPolicy::FilenameFallback`] trusts
/// the caller-supplied name. That name is user input; use
/// [`ExtensionPolicy::Strict`] when it must not decide the stored type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionPolicy {
    #[default]
    FilenameFallback,
    Strict,
}

const fn kind(extension: &'static str, mime: &'static str) -> Option<FileKind> {
    Some(FileKind { extension, mime })
}

fn match_signature(head: &[u8]) -> Option<FileKind> {
    match head {
        [0xFF, 0xD8, 0xFF, ..] => kind("jpg", "image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => kind("png", "image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => kind("gif", "image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
            kind("webp", "image/webp")
        }
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => {
            kind("wav", "audio/x-wav")
        }
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => kind("tif", "image/tiff"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => kind("mp4", "video/mp4"),
        [0x00, 0x00, 0x01, 0x00, ..] => kind("ico", "image/vnd.microsoft.icon"),
        [b'8', b'B', b'P', b'S', ..] => kind("psd", "image/vnd.adobe.photoshop"),
        [b'B', b'M', ..] => kind("bmp", "image/bmp"),
        [b'%', b'P', b'D', b'F', ..] => kind("pdf", "application/pdf"),
        [b'P', b'K', 0x03, 0x04, ..] | [b'P', b'K', 0x05, 0x06, ..] | [b'P', b'K', 0x07, 0x08, ..] => {
            kind("zip", "application/zip")
        }
        [0x1F, 0x8B, 0x08, ..] => kind("gz", "application/gzip"),
        [b'B', b'Z', b'h', ..] => kind("bz2", "application/x-bzip2"),
        [0xFD, b'7', b'z', b'X', b'Z', 0x00, ..] => kind("xz", "application/x-xz"),
        [b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C, ..] => kind("7z", "application/x-7z-compressed"),
        [b'R', b'a', b'r', b'!', 0x1A, 0x07, ..] => kind("rar", "application/vnd.rar"),
        [b'S', b'Q', b'L', b'i', b't', b'e', b' ', b'f', b'o', b'r', b'm', b'a', b't', b' ', b'3', 0x00, ..] => {
            kind("sqlite", "application/vnd.sqlite3")
        }
        [0x00, b'a', b's', b'm', ..] => kind("wasm", "application/wasm"),
        [0x7F, b'E', b'L', b'F', ..] => kind("elf", "application/x-executable"),
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB | 0xF3 | 0xF2, ..] => kind("mp3", "audio/mpeg"),
        [b'O', b'g', b'g', b'S', ..] => kind("ogg", "audio/ogg"),
        [b'f', b'L', b'a', b'C', ..] => kind("flac", "audio/x-flac"),
        [b'M', b'T', b'h', b'd', ..] => kind("mid", "audio/midi"),
        [0x1A, 0x45, 0xDF, 0xA3, ..] => {
            if contains(head, b"webm") {
                kind("webm", "video/webm")
            } else {
                kind("mkv", "video/x-matroska")
            }
        }
        _ if head.get(257..262) == Some(&b"ustar"[..]) => kind("tar", "application/x-tar"),
        _ => None,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classify a buffer by its leading bytes.
pub fn sniff(head: &[u8]) -> Sniffed {
    let head = &head[..head.len().min(SNIFF_LEN)];
    match match_signature(head) {
        Some(kind) => Sniffed::Known(kind),
        None => Sniffed::Unknown,
    }
}

/// Read up to [`SNIFF_LEN`] bytes of a file and classify them.
pub fn sniff_file(path: impl AsRef<Path>) -> Result<Sniffed> {
    let path = path.as_ref();
    let head = read_head(path)?;
    Ok(sniff(&head))
}

fn read_head(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| CasketError::io("sniff", path, e))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| CasketError::io("sniff", path, e))?;
    Ok(head)
}

/// MIME type for a buffer, falling back to text or generic binary.
pub fn content_type(head: &[u8]) -> &'static str {
    let head = &head[..head.len().min(SNIFF_LEN)];
    if let Some(kind) = match_signature(head) {
        return kind.mime;
    }
    if looks_like_text(head) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    let valid = match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte char cut off by the sniff window is still text.
        Err(e) => e.error_len().is_none(),
    };
    valid
        && head
            .iter()
            .all(|&b| !b.is_ascii_control() || matches!(b, b'\t' | b'\n' | b'\r' | 0x0C))
}

/// Pick a storage extension for an upload from its content and name.
///
/// Only a small allow-list of types is accepted. Returns `None` when the
/// type is not on the list, or when the content is ambiguous and `policy`
/// forbids trusting the file name.
pub fn upload_extension(head: &[u8], filename: &str, policy: ExtensionPolicy) -> Option<String> {
    let mime = content_type(head);
    match mime {
        "image/jpeg" => Some("jpeg".to_string()),
        "image/png" => Some("png".to_string()),
        "image/gif" => Some("gif".to_string()),
        "application/pdf" => Some("pdf".to_string()),
        OCTET_STREAM | "application/zip" => match policy {
            ExtensionPolicy::FilenameFallback => {
                let ext = file_extension(filename);
                if ext.is_empty() {
                    None
                } else {
                    tracing::debug!(filename, mime, ext, "Extension taken from file name");
                    Some(ext.to_string())
                }
            }
            ExtensionPolicy::Strict => {
                tracing::warn!(filename, mime, "Ambiguous upload type rejected");
                None
            }
        },
        _ => None,
    }
}
