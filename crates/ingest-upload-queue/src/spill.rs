//! On-disk spill file framing.
//!
//! The wire format named in this toolkit's ancestry (fixed per-field layouts
//! for datapoint and event records) belongs to the concrete upload
//! endpoints, which are outside this core's scope. What the core owns is
//! the framing discipline those payloads ride on: each spilled batch is
//! written as a little-endian `u32` length prefix followed by that many
//! opaque bytes, concatenated, read until a short or invalid frame is hit.
//! Callers supply the codec for their own item type.

use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Appends one framed batch to the spill file at `path`, creating it (and
/// any missing parent directories left to the caller) if it doesn't exist.
pub async fn append_batch(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(&(bytes.len() as u32).to_le_bytes()).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

/// Reads every complete frame from `path` in order.
///
/// Stops at the first short or truncated frame without losing anything on
/// disk; the caller must not truncate the file unless [`read_all_frames`]
/// reports every byte was consumed (`.1 == file length`).
pub async fn read_all_frames(path: &Path) -> std::io::Result<(Vec<Vec<u8>>, u64)> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;

    let mut frames = Vec::new();
    let mut offset = 0usize;
    while offset + 4 <= buf.len() {
        let len = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()) as usize;
        let start = offset + 4;
        if start + len > buf.len() {
            #[cfg(feature = "tracing")]
            tracing::warn!(path = %path.display(), "spill file has a truncated trailing frame, stopping read");
            break;
        }
        frames.push(buf[start..start + len].to_vec());
        offset = start + len;
    }

    Ok((frames, offset as u64))
}

/// Truncates the spill file to empty. Tolerated to fail silently if the
/// file no longer exists.
pub async fn truncate(path: &Path) -> std::io::Result<()> {
    match File::create(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Whether the spill file exists and is non-empty.
pub async fn is_nonempty(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.len() > 0)
        .unwrap_or(false)
}
