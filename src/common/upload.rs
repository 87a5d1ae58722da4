use std::path::Path;

use axum::extract::multipart::Field;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::common::error::{AppError, AppResult};

const FALLBACK_FILE_NAME: &str = "upload.mp4";

/// An uploaded media file spooled to local disk.
///
/// The file is deleted when this value is dropped, so every exit path of a
/// request that owns one cleans up after itself.
#[derive(Debug)]
pub struct TempUpload {
    path: TempPath,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Streams a multipart field into a fresh temp file under `dir`.
pub async fn spool_to_temp(field: Field<'_>, dir: &Path) -> AppResult<TempUpload> {
    let file_name = clean_file_name(field.file_name().unwrap_or(FALLBACK_FILE_NAME));
    let content_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| mime_guess::from_path(&file_name).first_or_octet_stream().to_string());

    let (path, size) = spool_stream(field, dir, "dub-upload-", &suffix_for(&file_name), |e| {
        error!("Upload stream error: {}", e);
        AppError::Validation(format!("Upload interrupted: {}", e))
    })
    .await?;

    if size == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    debug!("Spooled {} ({} bytes) to {}", file_name, size, path.display());

    Ok(TempUpload {
        path,
        file_name,
        content_type,
        size,
    })
}

/// Writes a byte stream chunk by chunk into a temp file under `dir`.
///
/// The file never lives longer than the returned `TempPath`, including when
/// the stream fails halfway.
pub async fn spool_stream<S, E>(
    stream: S,
    dir: &Path,
    prefix: &str,
    suffix: &str,
    on_error: impl Fn(E) -> AppError,
) -> AppResult<(TempPath, u64)>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let named = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)?;
    let (std_file, path) = named.into_parts();
    let mut file = tokio::fs::File::from_std(std_file);

    let mut stream = std::pin::pin!(stream);
    let mut size: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(&on_error)?;
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;

    Ok((path, size))
}

/// `.ext` of a file name, or empty when it has none.
pub fn suffix_for(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Keeps only the final path component of a client supplied name.
fn clean_file_name(raw: &str) -> String {
    Path::new(raw.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}
