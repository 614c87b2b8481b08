pub mod job;
pub mod pool;
pub mod status;

pub use job::{Job, JobOutcome, JobResult};
pub use pool::WorkerPool;
pub use status::{JobStatus, JobStatusTable};
