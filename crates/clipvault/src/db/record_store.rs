//! Durable media records and the store abstraction the ingestion core uses.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::media_repo::{self, MediaRow};
use super::{Database, DatabaseError};
use crate::storage::Fingerprint;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 so that lexical order matches chronological order.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str, id: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Corrupt {
            id: id.to_string(),
            reason: format!("invalid created_at '{}': {}", s, e),
        })
}

// ─── MediaRecord ────────────────────────────────────────────────────────────

/// A persisted media file and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    pub title: String,
    pub fingerprint: Fingerprint,
    pub format: String,
    /// Absolute path of the backing file. Not exposed to API clients.
    #[serde(skip_serializing)]
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl MediaRecord {
    fn from_row(row: MediaRow) -> Result<Self, DatabaseError> {
        let created_at = parse_timestamp(&row.created_at, &row.id)?;
        Ok(Self {
            id: row.id,
            title: row.title,
            fingerprint: Fingerprint::from_encoded(row.fingerprint),
            format: row.format,
            file_path: PathBuf::from(row.file_path),
            created_at,
        })
    }

    fn to_row(&self) -> MediaRow {
        MediaRow {
            id: self.id.clone(),
            title: self.title.clone(),
            fingerprint: self.fingerprint.as_str().to_string(),
            format: self.format.clone(),
            file_path: self.file_path.to_string_lossy().to_string(),
            created_at: format_timestamp(self.created_at),
        }
    }
}

// ─── RecordStore ────────────────────────────────────────────────────────────

/// Durable record storage as seen by the workers and the quota enforcer.
///
/// Every method is atomic on its own; callers never rely on cross-call
/// transactions.
pub trait RecordStore: Send + Sync {
    /// Fails with [`DatabaseError::Conflict`] if the fingerprint is taken.
    fn insert(&self, record: &MediaRecord) -> Result<(), DatabaseError>;

    fn exists_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, DatabaseError>;

    /// Records created before `cutoff`, ascending by creation time.
    fn select_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<MediaRecord>, DatabaseError>;

    /// Returns whether a record was removed.
    fn delete_by_id(&self, id: &str) -> Result<bool, DatabaseError>;

    fn find_by_id(&self, id: &str) -> Result<Option<MediaRecord>, DatabaseError>;

    /// All records, newest first.
    fn list_recent(&self) -> Result<Vec<MediaRecord>, DatabaseError>;
}

impl RecordStore for Database {
    fn insert(&self, record: &MediaRecord) -> Result<(), DatabaseError> {
        media_repo::insert(self, &record.to_row())
    }

    fn exists_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, DatabaseError> {
        media_repo::exists_by_fingerprint(self, fingerprint.as_str())
    }

    fn select_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<MediaRecord>, DatabaseError> {
        media_repo::select_older_than(self, &format_timestamp(cutoff))?
            .into_iter()
            .map(MediaRecord::from_row)
            .collect()
    }

    fn delete_by_id(&self, id: &str) -> Result<bool, DatabaseError> {
        media_repo::delete_by_id(self, id)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<MediaRecord>, DatabaseError> {
        media_repo::find_by_id(self, id)?
            .map(MediaRecord::from_row)
            .transpose()
    }

    fn list_recent(&self) -> Result<Vec<MediaRecord>, DatabaseError> {
        media_repo::list_recent(self)?
            .into_iter()
            .map(MediaRecord::from_row)
            .collect()
    }
}

// ─── DuplicateIndex ─────────────────────────────────────────────────────────

/// Fast-path duplicate check backed by the record store.
///
/// A `false` answer is advisory only: the unique constraint checked by
/// [`RecordStore::insert`] decides races between workers.
#[derive(Clone)]
pub struct DuplicateIndex {
    records: Arc<dyn RecordStore>,
}

impl DuplicateIndex {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub fn exists(&self, fingerprint: &Fingerprint) -> Result<bool, DatabaseError> {
        self.records.exists_by_fingerprint(fingerprint)
    }
}
