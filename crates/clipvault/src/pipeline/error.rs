use thiserror::Error;

/// Errors that end a job in the `failed` state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Hashing failed: {0}")]
    Hash(#[from] crate::error::StorageError),

    #[error("Persisting record failed: {0}")]
    Persist(#[from] crate::db::DatabaseError),

    #[error("Worker panicked: {0}")]
    Panic(String),
}
