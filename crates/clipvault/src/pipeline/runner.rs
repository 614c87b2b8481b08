use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tracing::{debug, info_span};

use crate::db::{DuplicateIndex, MediaRecord, RecordStore};
use crate::derivative::DerivativeGenerator;
use crate::sanitize;
use crate::storage::filesystem::discard;
use crate::storage::{hash_file, FileStorage, Fingerprint};
use crate::worker::job::{Job, JobResult};
use crate::worker::status::{JobStatus, JobStatusTable};

use super::error::PipelineError;

/// The per-job work a worker thread performs: hash, deduplicate, record and
/// generate a thumbnail.
pub struct IngestPipeline {
    duplicates: DuplicateIndex,
    records: Arc<dyn RecordStore>,
    storage: FileStorage,
    derivatives: Arc<dyn DerivativeGenerator>,
    statuses: Arc<JobStatusTable>,
}

impl IngestPipeline {
    pub fn new(
        records: Arc<dyn RecordStore>,
        storage: FileStorage,
        derivatives: Arc<dyn DerivativeGenerator>,
        statuses: Arc<JobStatusTable>,
    ) -> Self {
        Self {
            duplicates: DuplicateIndex::new(Arc::clone(&records)),
            records,
            storage,
            derivatives,
            statuses,
        }
    }

    /// Runs one job to a terminal status. Never returns an error: every
    /// failure is logged, reflected in the status table and the result.
    pub fn run(&self, job: &Job) -> JobResult {
        let filename = sanitize::redact_path(&job.source_path);
        let _pipeline_span = info_span!("ingest",
            job_id = %job.id,
            filename = %filename,
        )
        .entered();

        self.statuses.transition(&job.id, JobStatus::Processing);

        // Step 1: Fingerprint the content
        let fingerprint = {
            let _step = info_span!("hash").entered();
            match hash_file(&job.source_path) {
                Ok(fingerprint) => fingerprint,
                Err(e) => return self.fail(job, e.into()),
            }
        };
        debug!(fingerprint = %fingerprint, "content hashed");

        // Step 2: Fast-path duplicate check
        {
            let _step = info_span!("dedupe").entered();
            match self.duplicates.exists(&fingerprint) {
                Ok(true) => return self.duplicate(job, fingerprint),
                Ok(false) => {}
                // The insert below still enforces uniqueness.
                Err(e) => warn!("Duplicate lookup failed for job {}: {}", job.id, e),
            }
        }

        // Step 3: Persist the record
        {
            let _step = info_span!("persist").entered();
            let record = MediaRecord {
                id: job.id.clone(),
                title: job.title.clone(),
                fingerprint: fingerprint.clone(),
                format: job.format.extension().to_string(),
                file_path: job.source_path.clone(),
                created_at: Utc::now(),
            };
            match self.records.insert(&record) {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    debug!("lost insert race for fingerprint");
                    return self.duplicate(job, fingerprint);
                }
                Err(e) => return self.fail(job, e.into()),
            }
        }

        // Step 4: Thumbnail, best-effort
        {
            let _step = info_span!("derivative").entered();
            let output = self.storage.thumbnail_path(&job.id);
            if let Err(e) = self.derivatives.generate(&job.source_path, &output) {
                warn!("Thumbnail generation failed for job {}: {}", job.id, e);
                discard(&output);
            }
        }

        self.statuses.transition(&job.id, JobStatus::Completed);
        info!("Stored media {} ({})", job.id, filename);
        JobResult::stored(job, fingerprint)
    }

    /// Marks a job that could not finish normally as failed.
    pub(crate) fn fail(&self, job: &Job, err: PipelineError) -> JobResult {
        error!("Job {} failed: {}", job.id, err);
        discard(&job.source_path);
        self.statuses.transition(&job.id, JobStatus::Failed);
        JobResult::failure(job, err.to_string())
    }

    fn duplicate(&self, job: &Job, fingerprint: Fingerprint) -> JobResult {
        info!("Job {} is a duplicate of existing content, discarding", job.id);
        discard(&job.source_path);
        self.statuses.transition(&job.id, JobStatus::Completed);
        JobResult::duplicate(job, fingerprint)
    }
}
