//! Admission of staged uploads and the read/remove surface around them.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use log::{info, warn};
use serde::Serialize;
use tracing::info_span;
use uuid::Uuid;

use crate::config::{Config, MediaFormat};
use crate::db::{Database, MediaRecord, RecordStore};
use crate::derivative::{self, DerivativeGenerator};
use crate::error::{AdmissionError, ClipvaultError, Result, StorageError};
use crate::pipeline::IngestPipeline;
use crate::sanitize;
use crate::storage::filesystem::{discard, ensure_directory, remove_if_exists};
use crate::storage::{FileStorage, QuotaEnforcer};
use crate::worker::{Job, JobResult, JobStatus, JobStatusTable, WorkerPool};

pub const MAX_TITLE_LENGTH: usize = 255;

/// Enough leading bytes to recognise every supported container.
const SNIFF_LENGTH: u64 = 16;

/// An upload fully written to the staging directory.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub title: String,
    pub staged_path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub id: String,
    pub status: JobStatus,
}

/// Front door of the ingestion core.
///
/// Owns the worker pool and the job status table; shares the record store
/// with the workers and the quota enforcer.
pub struct IngestService {
    config: Config,
    records: Arc<dyn RecordStore>,
    storage: FileStorage,
    quota: QuotaEnforcer,
    statuses: Arc<JobStatusTable>,
    pool: WorkerPool,
    // Serializes quota check, eviction and adoption across admissions.
    admission: Mutex<()>,
}

impl IngestService {
    /// Opens the configured database and starts the workers.
    pub fn from_config(config: Config) -> Result<Self> {
        let database = Database::open(&config.database_file())?;
        let derivatives: Arc<dyn DerivativeGenerator> =
            Arc::from(derivative::from_config(&config.thumbnail));
        Self::new(config, Arc::new(database), derivatives)
    }

    pub fn new(
        config: Config,
        records: Arc<dyn RecordStore>,
        derivatives: Arc<dyn DerivativeGenerator>,
    ) -> Result<Self> {
        Self::with_result_sender(config, records, derivatives, None)
    }

    /// Like [`new`](Self::new), reporting every finished job on `results`.
    pub fn with_result_sender(
        config: Config,
        records: Arc<dyn RecordStore>,
        derivatives: Arc<dyn DerivativeGenerator>,
        results: Option<Sender<JobResult>>,
    ) -> Result<Self> {
        let storage = FileStorage::new(config.media_dir(), &config.thumbnail.extension);
        storage.ensure_directory()?;
        ensure_directory(&config.staging_dir())?;

        let statuses = Arc::new(JobStatusTable::new());
        let quota = QuotaEnforcer::new(
            storage.clone(),
            config.max_folder_size,
            Arc::clone(&records),
        );
        let pipeline = Arc::new(IngestPipeline::new(
            Arc::clone(&records),
            storage.clone(),
            derivatives,
            Arc::clone(&statuses),
        ));
        let pool = WorkerPool::with_result_sender(
            pipeline,
            config.worker_count,
            config.queue_capacity,
            results,
        )?;

        info!(
            "Ingest service ready: media at {}, quota {} bytes",
            storage.media_directory().display(),
            config.max_folder_size
        );

        Ok(Self {
            config,
            records,
            storage,
            quota,
            statuses,
            pool,
            admission: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.config.staging_dir()
    }

    /// Validates a staged upload, makes room for it and queues it.
    ///
    /// The staged file is consumed: it is either moved into the media
    /// directory or deleted. Blocks while the job queue is full.
    pub fn admit(&self, upload: StagedUpload) -> std::result::Result<Admission, AdmissionError> {
        let _span = info_span!("admit",
            filename = %sanitize::redact_path(&upload.staged_path),
            size = upload.size,
        )
        .entered();

        let (job, format) = match self.stage(&upload) {
            Ok(staged) => staged,
            Err(e) => {
                info!("Rejected upload '{}': {}", upload.title, e);
                discard(&upload.staged_path);
                return Err(e);
            }
        };

        let id = job.id.clone();
        let adopted = job.source_path.clone();
        if let Err(e) = self.pool.submit(job) {
            warn!("Could not queue job {}: {}", id, e);
            discard(&adopted);
            self.statuses.transition(&id, JobStatus::Failed);
            return Err(e.into());
        }

        info!("Admitted {} as {} ({})", upload.title, id, format);
        Ok(Admission {
            id,
            status: JobStatus::Pending,
        })
    }

    fn stage(
        &self,
        upload: &StagedUpload,
    ) -> std::result::Result<(Job, MediaFormat), AdmissionError> {
        validate_title(&upload.title)?;

        if upload.size > self.config.max_file_size {
            return Err(AdmissionError::TooLarge {
                size: upload.size,
                max: self.config.max_file_size,
            });
        }

        let format = sniff_format(&upload.staged_path)?
            .ok_or_else(|| AdmissionError::UnsupportedFormat("unrecognized content".to_string()))?;
        if !self.config.allowed_formats.contains(&format) {
            return Err(AdmissionError::UnsupportedFormat(format.to_string()));
        }

        let _guard = match self.admission.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if self.quota.check(upload.size)? {
            let report = self
                .quota
                .reclaim(upload.size, self.config.retention())?;
            info!(
                "Reclaimed {} bytes ({} evicted, {} pruned)",
                report.freed_bytes,
                report.evicted.len(),
                report.pruned.len()
            );
        }

        let id = Uuid::new_v4().to_string();
        let path = self
            .storage
            .adopt(&upload.staged_path, &id, format.extension())?;
        self.statuses.insert_pending(&id);

        Ok((Job::new(id, upload.title.trim(), path, format), format))
    }

    /// `None` for ids this process never admitted.
    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.statuses.get(id)
    }

    /// All stored media, newest first.
    pub fn list(&self) -> Result<Vec<MediaRecord>> {
        Ok(self.records.list_recent()?)
    }

    pub fn get(&self, id: &str) -> Result<Option<MediaRecord>> {
        Ok(self.records.find_by_id(id)?)
    }

    /// Deletes a stored media file, its thumbnail and its record.
    pub fn remove(&self, id: &str) -> Result<MediaRecord> {
        let record = self
            .records
            .find_by_id(id)?
            .ok_or_else(|| ClipvaultError::NotFound(id.to_string()))?;

        if !remove_if_exists(&record.file_path)? {
            warn!("File for {} was already missing", id);
        }
        if let Err(e) = remove_if_exists(&self.storage.thumbnail_path(id)) {
            warn!("Failed to delete thumbnail for {}: {}", id, e);
        }
        self.records.delete_by_id(id)?;

        info!("Removed media {}", id);
        Ok(record)
    }

    /// Public URL under which the media file is served.
    pub fn public_uri(&self, record: &MediaRecord) -> String {
        format!(
            "{}/files/{}.{}",
            self.config.public_uri.trim_end_matches('/'),
            record.id,
            record.format
        )
    }

    /// Bytes currently stored in the media directory.
    pub fn usage(&self) -> Result<u64> {
        Ok(self.storage.usage()?)
    }

    /// Stops admissions, lets queued jobs finish and joins the workers.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        self.pool.wait();
    }
}

fn validate_title(title: &str) -> std::result::Result<(), AdmissionError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AdmissionError::InvalidTitle(
            "title must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(AdmissionError::InvalidTitle(format!(
            "title exceeds {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn sniff_format(path: &Path) -> std::result::Result<Option<MediaFormat>, StorageError> {
    let read_error = |e: std::io::Error| StorageError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut header = Vec::with_capacity(SNIFF_LENGTH as usize);
    file.take(SNIFF_LENGTH)
        .read_to_end(&mut header)
        .map_err(read_error)?;

    Ok(MediaFormat::detect(&header))
}
