//! SQLite persistence for media records.
//!
//! Workers, the quota enforcer and the ingest service share one
//! connection through [`Database`]; the `media` table lives in `sql/`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod error;
pub mod media_repo;
pub mod migrations;
pub mod record_store;

pub use error::DatabaseError;
pub use record_store::{DuplicateIndex, MediaRecord, RecordStore};

/// Milliseconds a writer waits on a locked database file before failing.
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Shared handle to the media database.
///
/// Clones point at the same connection. Worker threads take turns on it,
/// and the unique fingerprint index settles concurrent inserts.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the media database at `path`, creating the file and its parent
    /// directory on first start, and brings the schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL; PRAGMA busy_timeout={};",
            BUSY_TIMEOUT_MS
        ))?;

        let db = Self::migrated(conn)?;
        log::info!("Media database ready at {}", path.display());
        Ok(db)
    }

    /// Volatile database; records vanish with the handle.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// Fallback location when no `database_path` is configured:
/// `<data dir>/clipvault/clipvault.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("clipvault").join("clipvault.db"))
}
