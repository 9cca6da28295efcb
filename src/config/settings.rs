use serde::Deserialize;
use std::path::PathBuf;
use crate::config::env::{self, EnvKey};
use crate::workers::encode_queue::FailurePolicy;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub failure_policy: FailurePolicy,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        let server_port = env::get_parsed(EnvKey::ServerPort, 3000);
        let default_base_url = format!("http://localhost:{}", server_port);

        Ok(Self {
            server_port,
            database_url: env::get(EnvKey::DatabaseUrl)?,
            jwt_secret: env::get(EnvKey::JwtSecret)?,
            upload_dir: PathBuf::from(env::get_or(EnvKey::UploadDir, "uploads")),
            public_base_url: env::get_or(EnvKey::PublicBaseUrl, &default_base_url),
            ffmpeg_path: env::get_or(EnvKey::FfmpegPath, "ffmpeg"),
            ffprobe_path: env::get_or(EnvKey::FfprobePath, "ffprobe"),
            failure_policy: env::get_parsed(EnvKey::EncodeFailurePolicy, FailurePolicy::Halt),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 512 * 1024 * 1024),
        })
    }

    /// Directory holding one sub-directory per uploaded video and its HLS package.
    pub fn videos_dir(&self) -> PathBuf {
        self.upload_dir.join("videos")
    }

    pub fn hls_master_url(&self, name: &str) -> String {
        format!(
            "{}/static/video-hls/{}/master.m3u8",
            self.public_base_url.trim_end_matches('/'),
            name
        )
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests(upload_dir: PathBuf) -> Self {
        Self {
            server_port: 3000,
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            upload_dir,
            public_base_url: "http://localhost:3000".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            failure_policy: FailurePolicy::Halt,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}
