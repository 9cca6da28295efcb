use super::dto::{UploadVideoResponse, VideoStatusResponse};
use crate::common::upload::{stream_to_file, video_extension};
use crate::state::AppState;
use crate::workers::encode_queue::EncodeJob;
use anyhow::{anyhow, Result};
use axum::extract::multipart::Field;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

pub struct MediaService;

impl MediaService {
    /// A single path component made of `[A-Za-z0-9._-]` that is not `.` or `..`.
    pub fn is_safe_component(component: &str) -> bool {
        !component.is_empty()
            && !component.chars().all(|c| c == '.')
            && component
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    /// Saves the uploaded video under its own directory and queues it for
    /// HLS encoding. Returns before encoding starts. The caller has already
    /// checked the field's content type.
    pub async fn upload_video_hls(state: AppState, field: Field<'_>) -> Result<UploadVideoResponse> {
        let name = Uuid::new_v4().to_string();
        let ext = video_extension(field.file_name());
        let dir = state.config.videos_dir().join(&name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow!("Failed to prepare upload directory: {}", e))?;

        let source_path = dir.join(format!("{}.{}", name, ext));
        if let Err(e) = stream_to_file(field, &source_path).await {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(e);
        }

        if let Err(e) = state
            .encode_queue
            .enqueue(EncodeJob::new(name.clone(), source_path))
            .await
        {
            warn!(name = %name, error = %e, "Failed to queue uploaded video");
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(anyhow!("Failed to queue video for encoding: {}", e));
        }

        info!(name = %name, "Video uploaded and queued for HLS encoding");

        Ok(UploadVideoResponse {
            url: state.config.hls_master_url(&name),
            name,
        })
    }

    pub async fn video_status(state: AppState, id: &str) -> Result<Option<VideoStatusResponse>> {
        let record = state.status_store.get(id).await?;
        Ok(record.map(VideoStatusResponse::from))
    }

    /// Maps an HLS request onto a file inside the video's directory. Every
    /// component is checked so the result can never leave `videos_dir`.
    pub fn hls_file_path(state: &AppState, id: &str, rest: &[&str]) -> Option<PathBuf> {
        if !Self::is_safe_component(id) || !rest.iter().all(|c| Self::is_safe_component(c)) {
            return None;
        }

        let mut path = state.config.videos_dir().join(id);
        for component in rest {
            path.push(component);
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::MediaService;

    #[test]
    fn safe_components_reject_traversal() {
        assert!(MediaService::is_safe_component("0b6c6a9e-7f4e-4a8e-9d1b-3c2f1a0e9b7d"));
        assert!(MediaService::is_safe_component("fileSequence12.ts"));
        assert!(MediaService::is_safe_component("v0"));
        assert!(!MediaService::is_safe_component(".."));
        assert!(!MediaService::is_safe_component("."));
        assert!(!MediaService::is_safe_component(""));
        assert!(!MediaService::is_safe_component("a/b"));
        assert!(!MediaService::is_safe_component("..\\etc"));
    }
}
