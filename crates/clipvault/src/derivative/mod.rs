//! Derivative (thumbnail) generation.
//!
//! Generation is best-effort: callers log failures and carry on, the
//! ingested file is never rolled back because a derivative is missing.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::config::ThumbnailConfig;

#[derive(Error, Debug)]
pub enum DerivativeError {
    #[error("Failed to launch '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{tool}' exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Produces a derivative of `source` at `output`.
pub trait DerivativeGenerator: Send + Sync {
    fn generate(&self, source: &Path, output: &Path) -> Result<(), DerivativeError>;
}

/// Used when thumbnails are disabled.
pub struct NoopGenerator;

impl DerivativeGenerator for NoopGenerator {
    fn generate(&self, _source: &Path, _output: &Path) -> Result<(), DerivativeError> {
        Ok(())
    }
}

/// Extracts a single frame with an external `ffmpeg` binary.
pub struct FfmpegThumbnailer {
    ffmpeg_path: PathBuf,
    seek: String,
}

impl FfmpegThumbnailer {
    pub fn new<P: AsRef<Path>>(ffmpeg_path: P, seek: &str) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.as_ref().to_path_buf(),
            seek: seek.to_string(),
        }
    }

    fn tool_name(&self) -> String {
        self.ffmpeg_path.display().to_string()
    }
}

impl DerivativeGenerator for FfmpegThumbnailer {
    fn generate(&self, source: &Path, output: &Path) -> Result<(), DerivativeError> {
        let result = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(source)
            .arg("-ss")
            .arg(&self.seek)
            .arg("-vframes")
            .arg("1")
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DerivativeError::Spawn {
                tool: self.tool_name(),
                source: e,
            })?;

        if !result.status.success() {
            return Err(DerivativeError::Failed {
                tool: self.tool_name(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Builds the generator described by the thumbnail configuration.
pub fn from_config(config: &ThumbnailConfig) -> Box<dyn DerivativeGenerator> {
    if config.enabled {
        Box::new(FfmpegThumbnailer::new(&config.ffmpeg_path, &config.seek))
    } else {
        Box::new(NoopGenerator)
    }
}
