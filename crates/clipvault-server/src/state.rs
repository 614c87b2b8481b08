use std::sync::Arc;

use clipvault::IngestService;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    /// Upper bound for a single uploaded file, in bytes.
    pub max_file_size: u64,
}

impl AppState {
    pub fn new(ingest: Arc<IngestService>) -> Self {
        let max_file_size = ingest.config().max_file_size;
        Self {
            ingest,
            max_file_size,
        }
    }
}
