use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipvaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Quota error: {0}")]
    Quota(#[from] QuotaError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Admission rejected: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Media not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value for environment variable {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to traverse '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error(
        "Unable to free the required space ({required} bytes); only {freed} bytes freed, {shortfall} bytes short"
    )]
    InsufficientSpace {
        required: u64,
        freed: u64,
        shortfall: u64,
    },

    #[error("Failed to measure storage usage: {0}")]
    Usage(#[from] StorageError),

    #[error("Failed to query records for eviction: {0}")]
    Records(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Job queue is full")]
    QueueFull,
}

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("File size {size} exceeds limit of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported media format: {0}")]
    UnsupportedFormat(String),

    #[error("Insufficient storage: {0}")]
    Quota(#[from] QuotaError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Submission failed: {0}")]
    Worker(#[from] WorkerError),
}

pub type Result<T> = std::result::Result<T, ClipvaultError>;
