//! Queries against the `media` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw media row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub id: String,
    pub title: String,
    pub fingerprint: String,
    pub format: String,
    pub file_path: String,
    pub created_at: String,
}

impl MediaRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            fingerprint: row.get("fingerprint")?,
            format: row.get("format")?,
            file_path: row.get("file_path")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Inserts a new media row. Fails with [`DatabaseError::Conflict`] when the
/// fingerprint is already registered.
pub fn insert(db: &Database, media: &MediaRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO media (id, title, fingerprint, format, file_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                media.id,
                media.title,
                media.fingerprint,
                media.format,
                media.file_path,
                media.created_at,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                DatabaseError::Conflict {
                    fingerprint: media.fingerprint.clone(),
                }
            } else {
                DatabaseError::Sqlite(e)
            }
        })?;
        Ok(())
    })
}

/// Returns true if a row with this fingerprint exists.
pub fn exists_by_fingerprint(db: &Database, fingerprint: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM media WHERE fingerprint = ?1)",
            params![fingerprint],
            |r| r.get(0),
        )?;
        Ok(exists)
    })
}

/// Finds a media row by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<MediaRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM media WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], MediaRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Rows created strictly before `cutoff`, oldest first.
pub fn select_older_than(db: &Database, cutoff: &str) -> Result<Vec<MediaRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM media WHERE created_at < ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![cutoff], MediaRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// All rows, newest first.
pub fn list_recent(db: &Database) -> Result<Vec<MediaRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM media ORDER BY created_at DESC, id ASC")?;
        let rows = stmt
            .query_map([], MediaRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a row by ID. Returns whether a row was removed.
pub fn delete_by_id(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}
