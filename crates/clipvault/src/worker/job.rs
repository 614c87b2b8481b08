use std::path::PathBuf;

use crate::config::MediaFormat;
use crate::storage::Fingerprint;

/// An admitted upload waiting to be hashed and recorded.
///
/// `source_path` already lives in the media directory under `<id>.<format>`.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub source_path: PathBuf,
    pub format: MediaFormat,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source_path: PathBuf,
        format: MediaFormat,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_path,
            format,
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// A new record was written.
    Stored { fingerprint: Fingerprint },
    /// The content was already known; the upload was discarded.
    Duplicate { fingerprint: Fingerprint },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn stored(job: &Job, fingerprint: Fingerprint) -> Self {
        Self {
            job_id: job.id.clone(),
            outcome: JobOutcome::Stored { fingerprint },
        }
    }

    pub fn duplicate(job: &Job, fingerprint: Fingerprint) -> Self {
        Self {
            job_id: job.id.clone(),
            outcome: JobOutcome::Duplicate { fingerprint },
        }
    }

    pub fn failure(job: &Job, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            outcome: JobOutcome::Failed { error },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, JobOutcome::Failed { .. })
    }
}
