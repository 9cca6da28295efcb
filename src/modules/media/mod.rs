use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use crate::state::AppState;
use tower_http::limit::RequestBodyLimitLayer;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;
pub mod static_handler;

pub fn router(state: AppState) -> axum::Router<AppState> {
    let max_upload_bytes = state.config.max_upload_bytes;

    let upload_routes = Router::new()
        .route("/upload-video-hls", post(handler::upload_video_hls))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route("/video-status/{id}", get(handler::video_status))
        .merge(upload_routes)
        .route_layer(middleware::from_fn(crate::middleware::verified::verified_guard))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware
        ))
}

pub fn static_router() -> axum::Router<AppState> {
    Router::new()
        .route("/video-hls/{id}/master.m3u8", get(static_handler::serve_master_playlist))
        .route("/video-hls/{id}/{v}/{segment}", get(static_handler::serve_segment))
}

#[cfg(test)]
mod tests;
