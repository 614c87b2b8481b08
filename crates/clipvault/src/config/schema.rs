use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub media_directory: String,
    #[serde(default)]
    pub staging_directory: Option<String>,
    #[serde(default)]
    pub database_path: Option<String>,
    pub public_uri: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_folder_size")]
    pub max_folder_size: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<MediaFormat>,
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_worker_count() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    100
}

// 5000 MiB
fn default_max_file_size() -> u64 {
    5000 << 20
}

// 10000 MiB
fn default_max_folder_size() -> u64 {
    10000 << 20
}

fn default_retention_days() -> u32 {
    7
}

fn default_allowed_formats() -> Vec<MediaFormat> {
    vec![MediaFormat::Mp4]
}

impl Config {
    /// Minimal configuration with defaults for everything optional.
    pub fn new(media_directory: impl Into<String>, public_uri: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            media_directory: media_directory.into(),
            staging_directory: None,
            database_path: None,
            public_uri: public_uri.into(),
            host: default_host(),
            port: default_port(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            max_file_size: default_max_file_size(),
            max_folder_size: default_max_folder_size(),
            retention_days: default_retention_days(),
            allowed_formats: default_allowed_formats(),
            thumbnail: ThumbnailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn media_dir(&self) -> PathBuf {
        PathBuf::from(&self.media_directory)
    }

    /// Where uploads are written before admission. Kept outside the media
    /// directory so partial uploads never count against the quota.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("clipvault-staging"))
    }

    pub fn database_file(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| PathBuf::from("clipvault.db"))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_thumbnail_extension")]
    pub extension: String,
    /// Timestamp of the extracted frame, in ffmpeg `-ss` syntax.
    #[serde(default = "default_seek")]
    pub seek: String,
}

fn default_true() -> bool {
    true
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_thumbnail_extension() -> String {
    "jpg".to_string()
}

fn default_seek() -> String {
    "00:00:01.000".to_string()
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg_path: default_ffmpeg_path(),
            extension: default_thumbnail_extension(),
            seek: default_seek(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Mp4,
    Mov,
    Webm,
}

impl MediaFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Webm => "webm",
        }
    }

    /// Identifies a container from the first bytes of a file.
    ///
    /// ISO-BMFF files start with a box size followed by `ftyp` and a major
    /// brand; WebM starts with the EBML magic. Only video brands are
    /// recognized, so AVIF/HEIC images and M4A audio yield `None`.
    pub fn detect(header: &[u8]) -> Option<Self> {
        const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            return Self::from_major_brand(&header[8..12]);
        }
        if header.starts_with(&EBML_MAGIC) {
            return Some(Self::Webm);
        }
        None
    }

    fn from_major_brand(brand: &[u8]) -> Option<Self> {
        match brand {
            b"qt  " => Some(Self::Mov),
            b"isom" | b"iso2" | b"iso4" | b"iso5" | b"iso6" | b"avc1" | b"M4V " | b"M4VH"
            | b"M4VP" | b"dash" | b"MSNV" => Some(Self::Mp4),
            _ if brand.starts_with(b"mp4") => Some(Self::Mp4),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
