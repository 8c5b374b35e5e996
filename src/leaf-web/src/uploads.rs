use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request};
use log::info;
use multer::{Constraints, Multipart, SizeLimit};
use unicode_normalization::UnicodeNormalization;

use crate::error::AppError;

/// Multipart field holding the leaf photo.
pub const FILE_FIELD: &str = "file";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "AUX", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1",
    "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9", "PRN", "NUL",
];

/// Empties the upload directory, creating it if needed.
pub fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;

    info!("Reset upload directory {}", dir.display());
    Ok(())
}

/// Reduces a client supplied file name to one that is safe to join onto the
/// upload directory. Returns `None` when nothing usable is left.
pub fn secure_filename(name: &str) -> Option<String> {
    // Decompose first so accented and fullwidth letters keep their ASCII base.
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return Some(format!("_{}", trimmed));
    }

    Some(trimmed.to_owned())
}

/// Writes an upload under `dir`, replacing an earlier file of the same name.
pub async fn save(dir: &Path, filename: &str, data: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(filename);
    tokio::fs::write(&path, data).await?;
    Ok(path)
}

pub struct Upload {
    /// File name as sent by the browser
    pub filename: String,
    pub data: Bytes,
}

/// Reads the `file` part of a multipart request, refusing bodies larger than
/// `limit` bytes.
pub async fn read_upload(req: Request<Body>, limit: u64) -> Result<Upload, AppError> {
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or(AppError::MissingFile)?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    let mut multipart = Multipart::with_constraints(req.into_body(), boundary, constraints);

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_owned();
        let data = field.bytes().await?;

        return Ok(Upload { filename, data });
    }

    Err(AppError::MissingFile)
}
