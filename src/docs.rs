use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::media::handler::upload_video_hls,
        crate::modules::media::handler::video_status,
        crate::modules::media::handler::health,
        crate::modules::media::static_handler::serve_master_playlist,
        crate::modules::media::static_handler::serve_segment,
    ),
    components(
        schemas(
            crate::modules::media::dto::UploadVideoResponse,
            crate::modules::media::dto::VideoStatusResponse,
            crate::modules::media::dto::QueueHealthResponse,
        )
    ),
    tags(
        (name = "Media", description = "Video upload, HLS encoding status and playback")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

use utoipa::Modify;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
