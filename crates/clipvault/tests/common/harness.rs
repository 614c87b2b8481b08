//! Test harness for isolated ingestion runs.
//!
//! Each harness owns a temp directory with `media/` and `staging/`, an
//! in-memory database shared with the service under test, and helpers to
//! stage uploads and wait for jobs to settle.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tempfile::TempDir;

use clipvault::config::Config;
use clipvault::db::{Database, MediaRecord, RecordStore};
use clipvault::derivative::{DerivativeError, DerivativeGenerator, NoopGenerator};
use clipvault::storage::Fingerprint;
use clipvault::{IngestService, JobStatus, StagedUpload};

use super::builders::ConfigBuilder;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes a small thumbnail and remembers every source it was asked about.
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<PathBuf>>,
}

impl RecordingGenerator {
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl DerivativeGenerator for RecordingGenerator {
    fn generate(&self, source: &Path, output: &Path) -> Result<(), DerivativeError> {
        self.calls.lock().unwrap().push(source.to_path_buf());
        std::fs::write(output, b"thumb").unwrap();
        Ok(())
    }
}

/// Holds every job inside thumbnail generation until released.
pub struct GatedGenerator {
    entered: Sender<PathBuf>,
    release: Receiver<()>,
}

/// Test-side handle of a [`GatedGenerator`].
pub struct Gate {
    pub entered: Receiver<PathBuf>,
    release: Sender<()>,
}

impl Gate {
    pub fn release(&self, jobs: usize) {
        for _ in 0..jobs {
            self.release.send(()).unwrap();
        }
    }
}

pub fn gated_generator() -> (GatedGenerator, Gate) {
    let (entered_tx, entered_rx) = unbounded();
    let (release_tx, release_rx) = unbounded();
    (
        GatedGenerator {
            entered: entered_tx,
            release: release_rx,
        },
        Gate {
            entered: entered_rx,
            release: release_tx,
        },
    )
}

impl DerivativeGenerator for GatedGenerator {
    fn generate(&self, source: &Path, _output: &Path) -> Result<(), DerivativeError> {
        let _ = self.entered.send(source.to_path_buf());
        let _ = self.release.recv();
        Ok(())
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub media_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let media_dir = temp_dir.path().join("media");
        let staging_dir = temp_dir.path().join("staging");
        std::fs::create_dir_all(&media_dir).expect("Failed to create media dir");
        std::fs::create_dir_all(&staging_dir).expect("Failed to create staging dir");

        Self {
            temp_dir,
            media_dir,
            staging_dir,
            db: Database::open_in_memory().expect("Failed to open database"),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new(&self.media_dir, &self.staging_dir)
    }

    /// Service over the harness database without thumbnails.
    pub fn service(&self, config: Config) -> IngestService {
        self.service_with(config, Arc::new(NoopGenerator))
    }

    pub fn service_with(
        &self,
        config: Config,
        derivatives: Arc<dyn DerivativeGenerator>,
    ) -> IngestService {
        IngestService::new(config, Arc::new(self.db.clone()), derivatives)
            .expect("Failed to start ingest service")
    }

    /// Writes `content` into the staging directory as a ready upload.
    pub fn stage(&self, title: &str, name: &str, content: &[u8]) -> StagedUpload {
        let staged_path = self.staging_dir.join(name);
        std::fs::write(&staged_path, content).expect("Failed to write staged upload");
        StagedUpload {
            title: title.to_string(),
            staged_path,
            size: content.len() as u64,
        }
    }

    /// Seeds a stored media file with a record `age_days` old.
    pub fn seed(&self, id: &str, size: usize, age_days: i64) -> MediaRecord {
        let file_path = self.media_dir.join(format!("{}.mp4", id));
        std::fs::write(&file_path, vec![7u8; size]).expect("Failed to seed media file");
        let record = MediaRecord {
            id: id.to_string(),
            title: format!("seeded {}", id),
            fingerprint: Fingerprint::from_encoded(format!("seed-{}", id)),
            format: "mp4".to_string(),
            file_path,
            created_at: Utc::now() - chrono::Duration::days(age_days),
        };
        self.db.insert(&record).expect("Failed to seed record");
        record
    }

    /// Polls until `id` reaches a terminal status.
    pub fn wait_for_terminal(&self, service: &IngestService, id: &str) -> JobStatus {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        loop {
            if let Some(status) = service.status(id) {
                if status == JobStatus::Completed || status == JobStatus::Failed {
                    return status;
                }
            }
            assert!(
                Instant::now() < deadline,
                "job {} did not settle, last status {:?}",
                id,
                service.status(id)
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Files directly inside the media directory, sorted by name.
    pub fn media_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.media_dir)
            .expect("Failed to read media dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(&self.staging_dir)
            .expect("Failed to read staging dir")
            .count()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
