use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::error::StorageError;

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copy + delete when rename fails, which handles
/// staging directories on a different device.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Sums the sizes of all regular files below `root`.
///
/// Entries that disappear while the walk is running are skipped; only a
/// missing root or other I/O errors fail the walk.
pub fn directory_size(root: &Path) -> Result<u64, StorageError> {
    let mut total = 0u64;

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 && vanished(&e) => continue,
            Err(e) => {
                return Err(StorageError::Walk {
                    path: root.to_path_buf(),
                    source: e,
                })
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) if vanished(&e) => continue,
            Err(e) => {
                return Err(StorageError::Walk {
                    path: entry.path().to_path_buf(),
                    source: e,
                })
            }
        };
        total += metadata.len();
    }

    Ok(total)
}

fn vanished(error: &walkdir::Error) -> bool {
    error
        .io_error()
        .is_some_and(|e| e.kind() == ErrorKind::NotFound)
}

/// Layout of the media directory: `<id>.<format>` for ingested files and
/// `<id>.<thumbnail extension>` for their derivatives.
#[derive(Debug, Clone)]
pub struct FileStorage {
    media_directory: PathBuf,
    thumbnail_extension: String,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(media_directory: P, thumbnail_extension: &str) -> Self {
        Self {
            media_directory: media_directory.as_ref().to_path_buf(),
            thumbnail_extension: thumbnail_extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn media_directory(&self) -> &Path {
        &self.media_directory
    }

    pub fn media_path(&self, id: &str, format: &str) -> PathBuf {
        self.media_directory.join(format!("{}.{}", id, format))
    }

    pub fn thumbnail_path(&self, id: &str) -> PathBuf {
        self.media_directory
            .join(format!("{}.{}", id, self.thumbnail_extension))
    }

    pub fn ensure_directory(&self) -> Result<(), StorageError> {
        ensure_directory(&self.media_directory)
    }

    /// Moves a staged upload into the media directory as `<id>.<format>`.
    pub fn adopt(&self, staged: &Path, id: &str, format: &str) -> Result<PathBuf, StorageError> {
        self.ensure_directory()?;

        let target = self.media_path(id, format);
        // symlink_metadata also catches dangling symlinks
        if std::fs::symlink_metadata(&target).is_ok() {
            return Err(StorageError::FileExists(target));
        }

        move_file(staged, &target)?;
        Ok(target)
    }

    /// Current size of everything stored in the media directory.
    pub fn usage(&self) -> Result<u64, StorageError> {
        directory_size(&self.media_directory)
    }
}

/// Creates `path` and its parents if missing.
pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Removes a file, treating "already gone" as success.
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::RemoveFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Best-effort removal used when abandoning a file; failures are only logged.
pub fn discard(path: &Path) {
    if let Err(e) = remove_if_exists(path) {
        warn!("Failed to discard {}: {}", path.display(), e);
    }
}
