//! In-memory job status table shared by the ingress side and the workers.

use dashmap::DashMap;
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job id to status, sharded so that workers updating different jobs do not
/// contend on a single lock.
///
/// Statuses only move forward (pending, processing, then a terminal state).
#[derive(Debug, Default)]
pub struct JobStatusTable {
    entries: DashMap<String, JobStatus>,
}

impl JobStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly admitted job. An existing entry is left untouched.
    pub fn insert_pending(&self, id: &str) {
        self.entries
            .entry(id.to_string())
            .or_insert(JobStatus::Pending);
    }

    /// Moves `id` to `next`, returning whether the table changed.
    ///
    /// Unknown ids are registered directly at `next`. Transitions that would
    /// go backwards, or leave a terminal state, are refused.
    pub fn transition(&self, id: &str, next: JobStatus) -> bool {
        let mut entry = self.entries.entry(id.to_string()).or_insert(next);
        let current = *entry;
        if current == next {
            return false;
        }
        if current.is_terminal() || next.rank() < current.rank() {
            debug!("Refusing status change {} -> {} for job {}", current, next, id);
            return false;
        }
        *entry = next;
        true
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.entries.get(id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
