use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::{IngestPipeline, PipelineError};
use crate::worker::job::{Job, JobResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fixed set of worker threads fed by one bounded FIFO queue.
///
/// When the queue holds `queue_capacity` jobs, [`submit`](Self::submit)
/// blocks until a worker frees a slot.
pub struct WorkerPool {
    job_sender: Sender<Job>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        Self::with_result_sender(pipeline, worker_count, queue_capacity, None)
    }

    /// Like [`new`](Self::new), additionally reporting every finished job on
    /// `result_sender`.
    pub fn with_result_sender(
        pipeline: Arc<IngestPipeline>,
        worker_count: usize,
        queue_capacity: usize,
        result_sender: Option<Sender<JobResult>>,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }
        if queue_capacity == 0 {
            return Err(WorkerError::SpawnFailed(
                "queue_capacity must be > 0".to_string(),
            ));
        }

        let (job_sender, job_receiver) = bounded::<Job>(queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::Builder::new()
                .name(format!("clipvault-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        job_rx,
                        result_tx,
                        shutdown_flag,
                        worker_pipeline,
                    );
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!(
            "Started {} workers (queue capacity {})",
            worker_count, queue_capacity
        );

        Ok(Self {
            job_sender,
            workers: Mutex::new(workers),
            shutdown,
        })
    }

    /// Enqueues a job, blocking while the queue is full.
    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Enqueues a job without waiting for a free slot.
    pub fn try_submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => WorkerError::QueueFull,
            TrySendError::Disconnected(_) => WorkerError::ChannelClosed,
        })
    }

    /// Number of jobs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.job_sender.len()
    }

    /// Stops accepting jobs. Workers finish whatever is already queued.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Waits for every worker to exit. Call after [`shutdown`](Self::shutdown).
    pub fn wait(&self) {
        let workers = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Job>,
    result_sender: Option<Sender<JobResult>>,
    shutdown: Arc<AtomicBool>,
    pipeline: Arc<IngestPipeline>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        match job_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(job) => {
                debug!("Worker {} processing job {}", worker_id, job.id);

                let result = match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(&job))) {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        pipeline.fail(&job, PipelineError::Panic(message))
                    }
                };

                if let Some(ref sender) = result_sender {
                    if let Err(e) = sender.send(result) {
                        debug!("Worker {} result receiver gone: {}", worker_id, e);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.load(Ordering::Relaxed) {
                    debug!("Worker {} received shutdown signal", worker_id);
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
