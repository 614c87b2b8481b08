pub mod config;
pub mod db;
pub mod derivative;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use config::{apply_env_overrides, load_config, Config, MediaFormat};
pub use db::{Database, DatabaseError, DuplicateIndex, MediaRecord, RecordStore};
pub use derivative::{DerivativeError, DerivativeGenerator, FfmpegThumbnailer, NoopGenerator};
pub use error::{
    AdmissionError, ClipvaultError, ConfigError, QuotaError, Result, StorageError, WorkerError,
};
pub use ingest::{Admission, IngestService, StagedUpload, MAX_TITLE_LENGTH};
pub use logging::init_logging;
pub use pipeline::IngestPipeline;
pub use storage::{hash_file, FileStorage, Fingerprint, QuotaEnforcer, ReclaimReport};
pub use worker::{Job, JobOutcome, JobResult, JobStatus, JobStatusTable, WorkerPool};

// Re-export crossbeam_channel so callers can build result channels
pub use crossbeam_channel;
