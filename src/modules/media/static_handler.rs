use super::service::MediaService;
use crate::state::AppState;
use crate::workers::hls_encoder::MASTER_PLAYLIST;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::Path as FsPath;
use tokio_util::io::ReaderStream;

fn content_type_for(path: &FsPath) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl".to_string(),
        Some("ts") => "video/mp2t".to_string(),
        _ => mime_guess::from_path(path).first_or_octet_stream().to_string(),
    }
}

async fn serve_file(path: Option<std::path::PathBuf>) -> Response {
    let Some(path) = path else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            tracing::error!("Failed to open {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&path));

    if let Ok(meta) = file.metadata().await {
        if !meta.is_file() {
            return StatusCode::NOT_FOUND.into_response();
        }
        builder = builder.header(header::CONTENT_LENGTH, meta.len());
    }

    let body = Body::from_stream(ReaderStream::new(file));
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Serve the master playlist of an encoded video
#[utoipa::path(
    get,
    path = "/static/video-hls/{id}/master.m3u8",
    params(
        ("id" = String, Path, description = "Video job name")
    ),
    responses(
        (status = 200, description = "Master playlist"),
        (status = 400, description = "Bad Request"),
        (status = 404, description = "Not Found")
    ),
    tag = "Media"
)]
pub async fn serve_master_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    serve_file(MediaService::hls_file_path(&state, &id, &[MASTER_PLAYLIST])).await
}

/// Serve a rendition playlist or segment
#[utoipa::path(
    get,
    path = "/static/video-hls/{id}/{v}/{segment}",
    params(
        ("id" = String, Path, description = "Video job name"),
        ("v" = String, Path, description = "Rendition directory, e.g. v0"),
        ("segment" = String, Path, description = "Playlist or segment file name")
    ),
    responses(
        (status = 200, description = "Playlist or segment"),
        (status = 400, description = "Bad Request"),
        (status = 404, description = "Not Found")
    ),
    tag = "Media"
)]
pub async fn serve_segment(
    State(state): State<AppState>,
    Path((id, v, segment)): Path<(String, String, String)>,
) -> Response {
    serve_file(MediaService::hls_file_path(&state, &id, &[v.as_str(), segment.as_str()])).await
}
