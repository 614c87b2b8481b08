//! Storage quota enforcement and age-based eviction.
//!
//! Eviction deletes backing files first and records second. File deletion is
//! the source of truth: a record whose file is already missing is an orphan
//! left behind by an interrupted eviction (or an external removal) and is
//! pruned the next time it is selected.

use std::io::ErrorKind;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use tracing::info_span;

use crate::db::RecordStore;
use crate::error::QuotaError;
use crate::storage::filesystem::{remove_if_exists, FileStorage};

/// Outcome of a successful [`QuotaEnforcer::reclaim`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    pub freed_bytes: u64,
    /// Records whose backing file was deleted by this pass.
    pub evicted: Vec<String>,
    /// Records whose backing file was already gone.
    pub pruned: Vec<String>,
}

pub struct QuotaEnforcer {
    storage: FileStorage,
    max_folder_size: u64,
    records: Arc<dyn RecordStore>,
}

impl QuotaEnforcer {
    pub fn new(storage: FileStorage, max_folder_size: u64, records: Arc<dyn RecordStore>) -> Self {
        Self {
            storage,
            max_folder_size,
            records,
        }
    }

    /// Returns true when storing `incoming_size` more bytes would exceed the quota.
    pub fn check(&self, incoming_size: u64) -> Result<bool, QuotaError> {
        let current = self.storage.usage()?;
        let exceeds = current.saturating_add(incoming_size) > self.max_folder_size;
        debug!(
            "Quota check: {} used + {} incoming vs {} allowed (exceeds: {})",
            current, incoming_size, self.max_folder_size, exceeds
        );
        Ok(exceeds)
    }

    /// Evicts records older than `retention`, oldest first, until at least
    /// `required_space` bytes have been freed.
    pub fn reclaim(
        &self,
        required_space: u64,
        retention: Duration,
    ) -> Result<ReclaimReport, QuotaError> {
        self.reclaim_before(required_space, Utc::now() - retention)
    }

    /// Like [`reclaim`](Self::reclaim) with an explicit cutoff instant.
    pub fn reclaim_before(
        &self,
        required_space: u64,
        cutoff: DateTime<Utc>,
    ) -> Result<ReclaimReport, QuotaError> {
        let _span = info_span!("reclaim", required_space, cutoff = %cutoff).entered();

        let mut report = ReclaimReport::default();
        if required_space == 0 {
            return Ok(report);
        }

        let candidates = self.records.select_older_than(cutoff)?;
        debug!("{} records eligible for eviction", candidates.len());

        for record in &candidates {
            let size = match std::fs::metadata(&record.file_path) {
                Ok(metadata) => metadata.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    info!(
                        "Record {} points at missing file {}, pruning",
                        record.id,
                        record.file_path.display()
                    );
                    self.remove_thumbnail(&record.id);
                    report.pruned.push(record.id.clone());
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Unable to access file {}: {}",
                        record.file_path.display(),
                        e
                    );
                    continue;
                }
            };

            if let Err(e) = std::fs::remove_file(&record.file_path) {
                warn!(
                    "Error deleting file {}: {}",
                    record.file_path.display(),
                    e
                );
                continue;
            }

            info!(
                "Deleted file: {} (size: {} bytes)",
                record.file_path.display(),
                size
            );
            report.freed_bytes += size;
            report.evicted.push(record.id.clone());

            self.remove_thumbnail(&record.id);

            if report.freed_bytes >= required_space {
                break;
            }
        }

        for id in report.evicted.iter().chain(report.pruned.iter()) {
            match self.records.delete_by_id(id) {
                Ok(_) => debug!("Deleted record {}", id),
                Err(e) => warn!("Failed to delete record {}: {}", id, e),
            }
        }

        info!("Total space freed: {} bytes", report.freed_bytes);

        if report.freed_bytes < required_space {
            return Err(QuotaError::InsufficientSpace {
                required: required_space,
                freed: report.freed_bytes,
                shortfall: required_space - report.freed_bytes,
            });
        }

        Ok(report)
    }

    fn remove_thumbnail(&self, id: &str) {
        let thumbnail = self.storage.thumbnail_path(id);
        if let Err(e) = remove_if_exists(&thumbnail) {
            warn!("Failed to delete thumbnail for {}: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, MediaRecord};
    use crate::storage::Fingerprint;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        db: Database,
        storage: FileStorage,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let storage = FileStorage::new(temp_dir.path(), "jpg");
            Self {
                _temp_dir: temp_dir,
                db: Database::open_in_memory().unwrap(),
                storage,
            }
        }

        fn enforcer(&self, max: u64) -> QuotaEnforcer {
            QuotaEnforcer::new(self.storage.clone(), max, Arc::new(self.db.clone()))
        }

        fn add(&self, id: &str, size: usize, age_days: i64) -> MediaRecord {
            let path = self.storage.media_path(id, "mp4");
            std::fs::write(&path, vec![1u8; size]).unwrap();
            let record = MediaRecord {
                id: id.to_string(),
                title: id.to_string(),
                fingerprint: Fingerprint::from_encoded(format!("fp-{}", id)),
                format: "mp4".to_string(),
                file_path: path,
                created_at: Utc::now() - Duration::days(age_days),
            };
            self.db.insert(&record).unwrap();
            record
        }

        fn has_record(&self, id: &str) -> bool {
            self.db.find_by_id(id).unwrap().is_some()
        }
    }

    #[test]
    fn test_check_against_quota() {
        let fx = Fixture::new();
        fx.add("a", 600, 1);
        let enforcer = fx.enforcer(1000);

        assert!(!enforcer.check(400).unwrap());
        assert!(enforcer.check(401).unwrap());
    }

    #[test]
    fn test_scenario_single_old_record() {
        let fx = Fixture::new();
        let old = fx.add("old", 600, 10);
        let enforcer = fx.enforcer(1000);

        assert!(enforcer.check(500).unwrap());
        let report = enforcer.reclaim(500, Duration::days(7)).unwrap();

        assert_eq!(report.freed_bytes, 600);
        assert_eq!(report.evicted, vec!["old".to_string()]);
        assert!(!old.file_path.exists());
        assert!(!fx.has_record("old"));
    }

    #[test]
    fn test_never_evicts_within_retention() {
        let fx = Fixture::new();
        let fresh = fx.add("fresh", 600, 3);
        let enforcer = fx.enforcer(1000);

        let err = enforcer.reclaim(500, Duration::days(7)).unwrap_err();
        match err {
            QuotaError::InsufficientSpace {
                required,
                freed,
                shortfall,
            } => {
                assert_eq!(required, 500);
                assert_eq!(freed, 0);
                assert_eq!(shortfall, 500);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fresh.file_path.exists());
        assert!(fx.has_record("fresh"));
    }

    #[test]
    fn test_stops_at_exact_boundary() {
        let fx = Fixture::new();
        let first = fx.add("first", 300, 30);
        let second = fx.add("second", 200, 20);
        let third = fx.add("third", 100, 10);
        let enforcer = fx.enforcer(1000);

        let report = enforcer.reclaim(500, Duration::days(7)).unwrap();

        assert_eq!(report.freed_bytes, 500);
        assert!(!first.file_path.exists());
        assert!(!second.file_path.exists());
        assert!(third.file_path.exists());
        assert!(fx.has_record("third"));
    }

    #[test]
    fn test_evicts_oldest_first() {
        let fx = Fixture::new();
        let newer = fx.add("newer", 500, 8);
        let oldest = fx.add("oldest", 500, 40);
        let enforcer = fx.enforcer(1000);

        let report = enforcer.reclaim(100, Duration::days(7)).unwrap();

        assert_eq!(report.evicted, vec!["oldest".to_string()]);
        assert!(!oldest.file_path.exists());
        assert!(newer.file_path.exists());
    }

    #[test]
    fn test_partial_eviction_reports_shortfall() {
        let fx = Fixture::new();
        let old = fx.add("old", 100, 10);
        fx.add("fresh", 900, 1);
        let enforcer = fx.enforcer(1000);

        let err = enforcer.reclaim(500, Duration::days(7)).unwrap_err();
        assert!(matches!(
            err,
            QuotaError::InsufficientSpace {
                freed: 100,
                shortfall: 400,
                ..
            }
        ));
        assert!(!old.file_path.exists());
        assert!(!fx.has_record("old"));
        assert!(fx.has_record("fresh"));
    }

    #[test]
    fn test_orphan_records_are_pruned_without_counting() {
        let fx = Fixture::new();
        let orphan = fx.add("orphan", 400, 20);
        std::fs::remove_file(&orphan.file_path).unwrap();
        fx.add("real", 300, 10);
        let enforcer = fx.enforcer(1000);

        let report = enforcer.reclaim(300, Duration::days(7)).unwrap();

        assert_eq!(report.freed_bytes, 300);
        assert_eq!(report.pruned, vec!["orphan".to_string()]);
        assert!(!fx.has_record("orphan"));
        assert!(!fx.has_record("real"));
    }

    #[test]
    fn test_thumbnail_removed_with_file() {
        let fx = Fixture::new();
        fx.add("clip", 200, 10);
        let thumbnail = fx.storage.thumbnail_path("clip");
        std::fs::write(&thumbnail, b"jpeg").unwrap();
        let enforcer = fx.enforcer(1000);

        enforcer.reclaim(1, Duration::days(7)).unwrap();
        assert!(!thumbnail.exists());
    }

    #[test]
    fn test_orphan_thumbnail_removed_on_prune() {
        let fx = Fixture::new();
        let orphan = fx.add("orphan", 400, 20);
        std::fs::remove_file(&orphan.file_path).unwrap();
        let thumbnail = fx.storage.thumbnail_path("orphan");
        std::fs::write(&thumbnail, vec![0u8; 50]).unwrap();
        let enforcer = fx.enforcer(1000);

        let err = enforcer.reclaim(100, Duration::days(7)).unwrap_err();
        assert!(matches!(err, QuotaError::InsufficientSpace { freed: 0, .. }));
        assert!(!thumbnail.exists());
        assert!(!fx.has_record("orphan"));
        assert_eq!(fx.storage.usage().unwrap(), 0);
    }

    #[test]
    fn test_zero_requirement_is_noop() {
        let fx = Fixture::new();
        let old = fx.add("old", 10, 30);
        let report = fx.enforcer(1000).reclaim(0, Duration::days(7)).unwrap();
        assert_eq!(report, ReclaimReport::default());
        assert!(old.file_path.exists());
    }
}
