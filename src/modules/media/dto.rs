use super::model::VideoStatus;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadVideoResponse {
    /// Job name, used for status polling and as the HLS package id.
    pub name: String,
    /// Master playlist URL, available once encoding succeeds.
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoStatusResponse {
    pub name: String,
    /// 0 = Pending, 1 = Processing, 2 = Success, 3 = Failed
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(with = "time::serde::iso8601")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::iso8601")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: OffsetDateTime,
}

impl From<VideoStatus> for VideoStatusResponse {
    fn from(record: VideoStatus) -> Self {
        Self {
            name: record.name,
            status: record.status.code(),
            message: record.message,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueHealthResponse {
    /// Jobs not yet dequeued, including the one being encoded.
    pub pending: usize,
    pub encoding: bool,
    /// The queue stopped on a failed job and needs manual intervention.
    pub halted: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VideoIdParam {
    #[validate(length(min = 1, max = 64, message = "Video id must be 1-64 characters"))]
    pub id: String,
}
