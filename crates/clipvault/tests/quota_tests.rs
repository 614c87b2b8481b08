//! Quota enforcement as seen through admission.

mod common;

use std::sync::Arc;

use clipvault::db::RecordStore;
use clipvault::storage::{FileStorage, QuotaEnforcer};
use clipvault::{AdmissionError, JobStatus, QuotaError};

use common::{mp4_bytes, TestHarness};

#[test]
fn test_old_record_is_evicted_to_make_room() {
    let harness = TestHarness::new();
    let old = harness.seed("old", 600, 10);
    let service = harness.service(
        harness
            .config()
            .max_file_size(1000)
            .max_folder_size(1000)
            .retention_days(7)
            .build(),
    );

    let admission = service
        .admit(harness.stage("incoming", "in.part", &mp4_bytes("incoming", 500)))
        .unwrap();
    assert_eq!(
        harness.wait_for_terminal(&service, &admission.id),
        JobStatus::Completed
    );

    assert!(!old.file_path.exists());
    assert!(harness.db.find_by_id("old").unwrap().is_none());
    assert_eq!(harness.media_files(), vec![format!("{}.mp4", admission.id)]);
    assert_eq!(service.usage().unwrap(), 500);

    service.shutdown();
}

#[test]
fn test_recent_records_are_never_evicted() {
    let harness = TestHarness::new();
    let fresh = harness.seed("fresh", 600, 2);
    let service = harness.service(
        harness
            .config()
            .max_file_size(1000)
            .max_folder_size(1000)
            .retention_days(7)
            .build(),
    );

    let err = service
        .admit(harness.stage("incoming", "in.part", &mp4_bytes("incoming", 500)))
        .unwrap_err();

    match err {
        AdmissionError::Quota(QuotaError::InsufficientSpace {
            required,
            freed,
            shortfall,
        }) => {
            assert_eq!(required, 500);
            assert_eq!(freed, 0);
            assert_eq!(shortfall, 500);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(fresh.file_path.exists());
    assert!(harness.db.find_by_id("fresh").unwrap().is_some());
    assert_eq!(harness.media_files(), vec!["fresh.mp4".to_string()]);
    assert_eq!(harness.staged_files(), 0);

    service.shutdown();
}

#[test]
fn test_upload_within_quota_evicts_nothing() {
    let harness = TestHarness::new();
    let old = harness.seed("old", 300, 30);
    let service = harness.service(harness.config().max_folder_size(1000).build());

    let admission = service
        .admit(harness.stage("small", "small.part", &mp4_bytes("small", 400)))
        .unwrap();
    harness.wait_for_terminal(&service, &admission.id);

    assert!(old.file_path.exists());
    assert_eq!(service.list().unwrap().len(), 2);

    service.shutdown();
}

#[test]
fn test_reclaim_with_explicit_enforcer() {
    let harness = TestHarness::new();
    let first = harness.seed("first", 300, 30);
    let second = harness.seed("second", 200, 20);
    let third = harness.seed("third", 100, 10);

    let enforcer = QuotaEnforcer::new(
        FileStorage::new(&harness.media_dir, "jpg"),
        1000,
        Arc::new(harness.db.clone()),
    );
    let report = enforcer
        .reclaim(500, chrono::Duration::days(7))
        .unwrap();

    assert_eq!(report.freed_bytes, 500);
    assert_eq!(report.evicted, vec!["first".to_string(), "second".to_string()]);
    assert!(!first.file_path.exists());
    assert!(!second.file_path.exists());
    assert!(third.file_path.exists());
}
