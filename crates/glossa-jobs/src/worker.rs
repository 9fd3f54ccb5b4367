//! Worker pool that claims jobs from the queue and runs the handler.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use glossa_core::{defaults, Job, JobErrorCode, JobRepository, Result};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent jobs.
    pub max_concurrent_jobs: usize,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            enabled,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A claimed job was handed to the handler.
    JobStarted { job_id: Uuid },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid },
    /// A job failed.
    JobFailed { job_id: Uuid, error: String },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| glossa_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that claims queued jobs and runs them through the handler.
///
/// Jobs are claimed in batches of up to `max_concurrent_jobs` and executed
/// concurrently in a `JoinSet`. When the queue is empty the loop sleeps for
/// the poll interval, or until the dispatcher's wake handle fires.
pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
    wake: Arc<Notify>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        handler: Arc<dyn JobHandler>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::WORKER_EVENT_CAPACITY);
        Self {
            jobs,
            handler,
            config,
            event_tx,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Wire the dispatcher's wake handle so enqueued work is picked up
    /// without waiting out the poll interval.
    pub fn with_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = wake;
        self
    }

    /// The wake handle this worker sleeps on; hand it to the dispatcher.
    pub fn wake(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(subsystem = "jobs", "job worker disabled, not starting");
            return;
        }

        info!(
            subsystem = "jobs",
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            "job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            // Check for shutdown before claiming jobs
            if shutdown_rx.try_recv().is_ok() {
                info!(subsystem = "jobs", "job worker received shutdown signal");
                break;
            }

            // Claim up to max_concurrent jobs
            let mut claimed = 0;
            let mut tasks = tokio::task::JoinSet::new();

            for _ in 0..self.config.max_concurrent_jobs {
                match self.claim_job().await {
                    Some(job) => {
                        claimed += 1;
                        let worker = self.clone_refs();
                        tasks.spawn(async move {
                            worker.execute(job).await;
                        });
                    }
                    None => break,
                }
            }

            if claimed == 0 {
                // Queue empty: sleep until the poll interval elapses, the
                // dispatcher wakes us, or shutdown is requested.
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(subsystem = "jobs", "job worker received shutdown signal");
                        break;
                    }
                    _ = sleep(poll_interval) => {}
                    _ = self.wake.notified() => {}
                }
            } else {
                debug!(subsystem = "jobs", claimed, "processing job batch");
                // Wait for all claimed jobs to finish
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        error!(subsystem = "jobs", error = ?e, "job task panicked");
                    }
                }
                // No sleep: immediately try to claim more jobs
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!(subsystem = "jobs", "job worker stopped");
    }

    /// Claim the next available job without processing it.
    async fn claim_job(&self) -> Option<Job> {
        match self.jobs.claim_next().await {
            Ok(next) => next,
            Err(e) => {
                error!(subsystem = "jobs", error = %e, "failed to claim job");
                None
            }
        }
    }

    /// Clone references needed for spawned job tasks.
    fn clone_refs(&self) -> JobWorkerRef {
        JobWorkerRef {
            jobs: self.jobs.clone(),
            handler: self.handler.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

/// Lightweight reference bundle for executing a single job in a spawned task.
struct JobWorkerRef {
    jobs: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorkerRef {
    /// Execute a single claimed job.
    async fn execute(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;

        info!(subsystem = "jobs", job_id = %job_id, "processing job");
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id });

        let ctx = JobContext::new(job);

        // A panicking handler must not take the worker down or leave the
        // job claimed-but-untouched forever.
        let result = match AssertUnwindSafe(self.handler.handle(ctx))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(subsystem = "jobs", job_id = %job_id, "job handler panicked");
                JobResult::Failed("job handler panicked".to_string())
            }
        };

        match result {
            JobResult::Success => {
                info!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "job finished"
                );
                let _ = self.event_tx.send(WorkerEvent::JobCompleted { job_id });
            }
            JobResult::Failed(error) => {
                self.ensure_failed(job_id).await;
                warn!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    %error,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "job failed"
                );
                let _ = self.event_tx.send(WorkerEvent::JobFailed { job_id, error });
            }
        }
    }

    /// Backstop: make sure a failed run left the job in a terminal state.
    ///
    /// The handler normally records FAILED itself with the precise error
    /// kind; this only catches handlers that bailed or panicked before any
    /// terminal write, so a claimed job is not redelivered forever.
    async fn ensure_failed(&self, job_id: Uuid) {
        match self.jobs.get(job_id).await {
            Ok(Some(job)) if !job.status.is_terminal() => {
                if let Err(e) = self.jobs.fail(job_id, JobErrorCode::TranslationFailed).await {
                    error!(subsystem = "jobs", job_id = %job_id, error = %e, "failed to record job failure");
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!(subsystem = "jobs", job_id = %job_id, error = %e, "failed to read job for failure backstop");
            }
        }
    }
}
