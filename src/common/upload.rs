use anyhow::{anyhow, Result};
use axum::extract::multipart::Field;
use futures_util::StreamExt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info};

/// Rejects anything that does not declare a `video/*` content type.
pub fn ensure_video_content_type(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(ct) if ct.starts_with("video/") => Ok(()),
        _ => Err(anyhow!("Invalid content type: only video/* allowed")),
    }
}

/// Extension for the stored upload, taken from the client file name when it
/// is a plain alphanumeric suffix.
pub fn video_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "mp4".to_string())
}

/// Streams one multipart field to `path` chunk by chunk. A partially written
/// file is removed when the stream breaks.
pub async fn stream_to_file(mut field: Field<'_>, path: &Path) -> Result<u64> {
    let file = File::create(path)
        .await
        .map_err(|e| anyhow!("Failed to create {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    let mut written: u64 = 0;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Stream error: {}", e);
                drop(writer);
                let _ = tokio::fs::remove_file(path).await;
                return Err(anyhow!("Stream interrupted"));
            }
        };

        if let Err(e) = writer.write_all(&chunk).await {
            error!("Write error: {}", e);
            drop(writer);
            let _ = tokio::fs::remove_file(path).await;
            return Err(anyhow!("Failed to write upload: {}", e));
        }
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    info!(bytes = written, path = %path.display(), "Upload stored");
    Ok(written)
}
