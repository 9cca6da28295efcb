use super::dto::{QueueHealthResponse, UploadVideoResponse, VideoIdParam, VideoStatusResponse};
use super::service::MediaService;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::upload::ensure_video_content_type;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use tracing::info;
use validator::Validate;

/// Upload a video for HLS encoding
/// Saves the file and queues it; the response does not wait for encoding.
#[utoipa::path(
    post,
    path = "/api/v1/medias/upload-video-hls",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video queued for encoding", body = ApiResponse<UploadVideoResponse>),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Media",
    security(("bearer_auth" = []))
)]
pub async fn upload_video_hls(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return ApiError::bad_request(format!("Invalid multipart body: {}", e)).into_response(),
        };

        if field.name() != Some("video") {
            continue;
        }

        if let Err(e) = ensure_video_content_type(field.content_type()) {
            return ApiError::bad_request(e.to_string()).into_response();
        }

        info!("Receiving video upload: {}", field.file_name().unwrap_or("unnamed"));

        return match MediaService::upload_video_hls(state, field).await {
            Ok(response) => ApiSuccess::ok(response, "Upload video successfully").into_response(),
            Err(e) => ApiError::internal(format!("Upload failed: {}", e)).into_response(),
        };
    }

    ApiError::bad_request("No video field found in multipart request").into_response()
}

/// Get encoding status of an uploaded video
#[utoipa::path(
    get,
    path = "/api/v1/medias/video-status/{id}",
    params(
        ("id" = String, Path, description = "Video job name returned by the upload")
    ),
    responses(
        (status = 200, description = "Encoding status", body = ApiResponse<VideoStatusResponse>),
        (status = 400, description = "Bad Request"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Video not found")
    ),
    tag = "Media",
    security(("bearer_auth" = []))
)]
pub async fn video_status(
    State(state): State<AppState>,
    Path(params): Path<VideoIdParam>,
) -> impl IntoResponse {
    if let Err(e) = params.validate() {
        return ApiError::bad_request(e.to_string()).into_response();
    }

    match MediaService::video_status(state, &params.id).await {
        Ok(Some(status)) => ApiSuccess::ok(status, "Get video status successfully").into_response(),
        Ok(None) => ApiError::not_found("Video not found").into_response(),
        Err(e) => ApiError::internal(e.to_string()).into_response(),
    }
}

/// Service health with encode queue state
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is up", body = ApiResponse<QueueHealthResponse>)
    ),
    tag = "Media"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let queue = &state.encode_queue;
    let health = QueueHealthResponse {
        pending: queue.pending().len(),
        encoding: queue.is_encoding(),
        halted: queue.is_halted(),
    };
    ApiSuccess::ok(health, "ok")
}
