use crate::app::create_app;
use crate::config::settings::AppConfig;
use crate::middleware::auth::TokenClaims;
use crate::modules::media::model::EncodingStatus;
use crate::modules::media::repository::memory::MemoryStatusStore;
use crate::modules::media::repository::StatusStore;
use crate::state::AppState;
use crate::workers::encode_queue::{EncodeQueue, FailurePolicy};
use crate::workers::hls_encoder::{EncodeError, VideoEncoder, MASTER_PLAYLIST};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const BOUNDARY: &str = "media-test-boundary";

/// Writes a tiny one-rendition package instead of running ffmpeg.
struct FakeHlsEncoder;

#[async_trait]
impl VideoEncoder for FakeHlsEncoder {
    async fn encode(&self, source: &Path) -> Result<PathBuf, EncodeError> {
        let dir = source.parent().unwrap().to_path_buf();
        let io = |e| EncodeError::Io { path: source.to_path_buf(), source: e };

        tokio::fs::create_dir_all(dir.join("v0")).await.map_err(io)?;
        tokio::fs::write(
            dir.join(MASTER_PLAYLIST),
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720\nv0/prog_index.m3u8\n",
        )
        .await
        .map_err(io)?;
        tokio::fs::write(dir.join("v0").join("fileSequence0.ts"), b"segment")
            .await
            .map_err(io)?;

        Ok(dir.join(MASTER_PLAYLIST))
    }
}

struct TestApp {
    dir: TempDir,
    app: Router,
    store: Arc<MemoryStatusStore>,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::for_tests(dir.path().to_path_buf());
    let store = Arc::new(MemoryStatusStore::new());
    let (queue, _driver) = EncodeQueue::start(
        store.clone(),
        Arc::new(FakeHlsEncoder),
        FailurePolicy::Halt,
        CancellationToken::new(),
    );
    let state = AppState::new(config, store.clone(), queue);

    TestApp {
        dir,
        app: create_app(state),
        store,
    }
}

fn token(verify: u8) -> String {
    let claims = TokenClaims {
        sub: "user-1".to_string(),
        verify,
        exp: (get_current_timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn upload(field: &str, content_type: &str, bearer: &str) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"holiday.mp4\"\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(b"not really an mp4 but the fake encoder does not care");
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/v1/medias/upload-video-hls")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_idle_queue() {
    let t = test_app();
    let response = t.app.oneshot(get("/api/v1/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["data"]["pending"], 0);
    assert_eq!(body["data"]["halted"], false);
}

#[tokio::test]
async fn status_requires_a_valid_token() {
    let t = test_app();

    let missing = t.app.clone().oneshot(get("/api/v1/medias/video-status/abc", None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let forged = t
        .app
        .oneshot(get("/api/v1/medias/video-status/abc", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unverified_users_are_forbidden() {
    let t = test_app();
    let response = t
        .app
        .oneshot(get("/api/v1/medias/video-status/abc", Some(&token(0))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn status_reports_numeric_code() {
    let t = test_app();
    t.store.create_pending("abc").await.unwrap();

    let response = t
        .app
        .oneshot(get("/api/v1/medias/video-status/abc", Some(&token(1))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["data"]["name"], "abc");
    assert_eq!(body["data"]["status"], 0);
    assert!(body["data"]["created_at"].is_string());
    assert!(body["data"].get("message").is_none());
}

#[tokio::test]
async fn unknown_video_is_not_found() {
    let t = test_app();
    let response = t
        .app
        .oneshot(get("/api/v1/medias/video-status/nope", Some(&token(1))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await["status"], "error");
}

#[tokio::test]
async fn upload_returns_immediately_and_package_becomes_playable() {
    let t = test_app();
    let response = t.app.clone().oneshot(upload("video", "video/mp4", &token(1))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    let name = body["data"]["name"].as_str().unwrap().to_string();
    assert_eq!(
        body["data"]["url"],
        format!("http://localhost:3000/static/video-hls/{name}/master.m3u8")
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while t.store.status_of(&name) != Some(EncodingStatus::Success) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("upload never finished encoding");

    let source = t.dir.path().join("videos").join(&name).join(format!("{name}.mp4"));
    assert!(!source.exists());

    let status = t
        .app
        .clone()
        .oneshot(get(&format!("/api/v1/medias/video-status/{name}"), Some(&token(1))))
        .await
        .unwrap();
    assert_eq!(json(status).await["data"]["status"], 2);

    let master = t
        .app
        .clone()
        .oneshot(get(&format!("/static/video-hls/{name}/master.m3u8"), None))
        .await
        .unwrap();
    assert_eq!(master.status(), StatusCode::OK);
    assert_eq!(master.headers()[header::CONTENT_TYPE], "application/vnd.apple.mpegurl");
    let playlist = to_bytes(master.into_body(), usize::MAX).await.unwrap();
    assert!(playlist.starts_with(b"#EXTM3U"));

    let segment = t
        .app
        .oneshot(get(&format!("/static/video-hls/{name}/v0/fileSequence0.ts"), None))
        .await
        .unwrap();
    assert_eq!(segment.status(), StatusCode::OK);
    assert_eq!(segment.headers()[header::CONTENT_TYPE], "video/mp2t");
}

#[tokio::test]
async fn upload_rejects_non_video_content() {
    let t = test_app();
    let response = t.app.oneshot(upload("video", "image/png", &token(1))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(t.store.len(), 0);
}

#[tokio::test]
async fn upload_without_video_field_is_rejected() {
    let t = test_app();
    let response = t.app.oneshot(upload("avatar", "video/mp4", &token(1))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(t.store.len(), 0);
}

#[tokio::test]
async fn static_files_refuse_traversal_and_missing_files() {
    let t = test_app();
    std::fs::write(t.dir.path().join("secret.txt"), b"nope").unwrap();

    let traversal = t
        .app
        .clone()
        .oneshot(get("/static/video-hls/abc/..%2F..%2F/secret.txt", None))
        .await
        .unwrap();
    assert_eq!(traversal.status(), StatusCode::BAD_REQUEST);

    let dots = t
        .app
        .clone()
        .oneshot(get("/static/video-hls/../master.m3u8", None))
        .await
        .unwrap();
    assert_ne!(dots.status(), StatusCode::OK);

    let missing = t
        .app
        .oneshot(get("/static/video-hls/abc/master.m3u8", None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
