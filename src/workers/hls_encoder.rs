use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

pub const MASTER_PLAYLIST: &str = "master.m3u8";
pub const VARIANT_PLAYLIST: &str = "prog_index.m3u8";

const SEGMENT_SECONDS: u32 = 6;
const GOP_SIZE: u32 = 48;
const AUDIO_BITRATE: &str = "128k";
const STDERR_TAIL_LINES: usize = 20;

/// (height, target bitrate in bit/s)
const LADDER: [(u32, u64); 3] = [(720, 2_500_000), (1080, 5_000_000), (1440, 8_000_000)];

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Source video {path} is not readable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not read video stream info: {0}")]
    Probe(String),
    #[error("{program} exited with {status}: {stderr}")]
    Tool {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Turns one source video into an HLS package. Implementations must report
/// failure through the returned error and never bring the process down.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Returns the path of the written master playlist.
    async fn encode(&self, source: &Path) -> Result<PathBuf, EncodeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub bit_rate: Option<u64>,
    pub has_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendition {
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    bit_rate: Option<String>,
}

/// Parses `ffprobe -of json` output into the facts the ladder needs.
pub fn parse_probe(json: &str) -> Result<VideoProbe, EncodeError> {
    let output: ProbeOutput =
        serde_json::from_str(json).map_err(|e| EncodeError::Probe(e.to_string()))?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| EncodeError::Probe("no video stream".to_string()))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(EncodeError::Probe("video stream has no dimensions".to_string())),
    };

    let bit_rate = video
        .bit_rate
        .as_deref()
        .and_then(|b| b.parse::<u64>().ok())
        .or_else(|| {
            output
                .format
                .as_ref()
                .and_then(|f| f.bit_rate.as_deref())
                .and_then(|b| b.parse::<u64>().ok())
        });

    let has_audio = output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoProbe { width, height, bit_rate, has_audio })
}

fn even(value: f64) -> u32 {
    let rounded = value.round() as u32;
    (rounded + 1) & !1
}

fn scaled_width(probe: &VideoProbe, height: u32) -> u32 {
    even(probe.width as f64 * height as f64 / probe.height as f64)
}

/// Picks the renditions to encode: every ladder rung not taller than the
/// source, or a single rendition at source size for small inputs.
pub fn rendition_ladder(probe: &VideoProbe) -> Vec<Rendition> {
    let cap = |bitrate: u64| probe.bit_rate.map_or(bitrate, |source| bitrate.min(source));

    let mut renditions: Vec<Rendition> = LADDER
        .iter()
        .filter(|(height, _)| *height <= probe.height)
        .map(|&(height, bitrate)| Rendition {
            width: scaled_width(probe, height),
            height,
            bitrate: cap(bitrate),
        })
        .collect();

    if renditions.is_empty() {
        let height = even(probe.height as f64);
        renditions.push(Rendition {
            width: scaled_width(probe, height),
            height,
            bitrate: cap(LADDER[0].1),
        });
    }

    renditions
}

/// Builds the single ffmpeg invocation that writes all renditions plus the
/// master playlist into `out_dir`.
pub fn build_hls_args(
    input: &Path,
    out_dir: &Path,
    renditions: &[Rendition],
    has_audio: bool,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.display().to_string(),
        "-preset".into(),
        "veryfast".into(),
        "-g".into(),
        GOP_SIZE.to_string(),
        "-sc_threshold".into(),
        "0".into(),
    ];

    for _ in renditions {
        args.extend(["-map", "0:v:0"].map(String::from));
        if has_audio {
            args.extend(["-map", "0:a:0"].map(String::from));
        }
    }

    for (i, r) in renditions.iter().enumerate() {
        args.extend([
            format!("-s:v:{i}"),
            format!("{}x{}", r.width, r.height),
            format!("-c:v:{i}"),
            "libx264".to_string(),
            format!("-b:v:{i}"),
            r.bitrate.to_string(),
        ]);
    }

    if has_audio {
        args.extend(["-c:a", "aac", "-b:a", AUDIO_BITRATE].map(String::from));
    }

    let stream_map = (0..renditions.len())
        .map(|i| if has_audio { format!("v:{i},a:{i}") } else { format!("v:{i}") })
        .collect::<Vec<_>>()
        .join(" ");

    args.extend([
        "-var_stream_map".to_string(),
        stream_map,
        "-master_pl_name".to_string(),
        MASTER_PLAYLIST.to_string(),
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        SEGMENT_SECONDS.to_string(),
        "-hls_list_size".to_string(),
        "0".to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_segment_filename".to_string(),
        out_dir.join("v%v").join("fileSequence%d.ts").display().to_string(),
        out_dir.join("v%v").join(VARIANT_PLAYLIST).display().to_string(),
    ]);

    args
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Encoder backed by the ffprobe/ffmpeg binaries.
#[derive(Debug, Clone)]
pub struct FfmpegHlsEncoder {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegHlsEncoder {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>, EncodeError> {
        debug!(program, ?args, "Running media tool");
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| EncodeError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(EncodeError::Tool {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(output.stdout)
    }

    pub async fn probe(&self, source: &Path) -> Result<VideoProbe, EncodeError> {
        let args: Vec<String> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "stream=codec_type,width,height,bit_rate:format=bit_rate".into(),
            "-of".into(),
            "json".into(),
            source.display().to_string(),
        ];
        let stdout = self.run(&self.ffprobe, &args).await?;
        parse_probe(&String::from_utf8_lossy(&stdout))
    }
}

#[async_trait]
impl VideoEncoder for FfmpegHlsEncoder {
    async fn encode(&self, source: &Path) -> Result<PathBuf, EncodeError> {
        let io_err = |source_err| EncodeError::Io {
            path: source.to_path_buf(),
            source: source_err,
        };

        tokio::fs::metadata(source).await.map_err(io_err)?;

        let out_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let probe = self.probe(source).await?;
        let renditions = rendition_ladder(&probe);
        info!(
            source = %source.display(),
            width = probe.width,
            height = probe.height,
            has_audio = probe.has_audio,
            variants = renditions.len(),
            "🎥 Encoding HLS package"
        );

        for i in 0..renditions.len() {
            tokio::fs::create_dir_all(out_dir.join(format!("v{i}")))
                .await
                .map_err(io_err)?;
        }

        let args = build_hls_args(source, &out_dir, &renditions, probe.has_audio);
        self.run(&self.ffmpeg, &args).await?;

        Ok(out_dir.join(MASTER_PLAYLIST))
    }
}
