//! Builders for test configurations and media payloads.

#![allow(dead_code)]

use std::path::Path;

use clipvault::config::{Config, MediaFormat};

/// Builder for `Config` instances pointing at a test directory.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// One worker, small queue, thumbnails off.
    pub fn new(media_dir: &Path, staging_dir: &Path) -> Self {
        let mut config = Config::new(
            media_dir.to_string_lossy().to_string(),
            "https://media.example.com",
        );
        config.staging_directory = Some(staging_dir.to_string_lossy().to_string());
        config.worker_count = 1;
        config.queue_capacity = 8;
        config.thumbnail.enabled = false;
        Self { config }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn max_folder_size(mut self, bytes: u64) -> Self {
        self.config.max_folder_size = bytes;
        self
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.retention_days = days;
        self
    }

    pub fn allowed_formats(mut self, formats: &[MediaFormat]) -> Self {
        self.config.allowed_formats = formats.to_vec();
        self
    }

    pub fn public_uri(mut self, uri: &str) -> Self {
        self.config.public_uri = uri.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// An MP4 payload of exactly `len` bytes (minimum 12) whose body is derived
/// from `seed`, so different seeds give different fingerprints.
pub fn mp4_bytes(seed: &str, len: usize) -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x18ftypisom".to_vec();
    let body = seed.as_bytes();
    while bytes.len() < len {
        bytes.push(body[bytes.len() % body.len().max(1)]);
    }
    bytes.truncate(len.max(12));
    bytes
}

/// A WebM (EBML) payload.
pub fn webm_bytes(seed: &str) -> Vec<u8> {
    let mut bytes = vec![0x1A, 0x45, 0xDF, 0xA3, 0x9F, 0x42, 0x86, 0x81];
    bytes.extend_from_slice(seed.as_bytes());
    bytes
}
