//! Job dispatch: the submission-side half of the queue.
//!
//! The jobs table doubles as the queue, so enqueuing inserts nothing: the
//! PENDING row written by the submitter *is* the queue entry.
//! [`QueueDispatcher::enqueue`] verifies that the record exists and wakes
//! sleeping worker pollers through a shared [`Notify`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use glossa_core::{Error, JobRepository, Result};

/// Schedules a job for asynchronous processing.
///
/// Delivery policy (claiming, redelivery, concurrency) belongs entirely to
/// the implementation; callers only hand over a job id.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Schedule the job for processing. The job record must already exist.
    async fn enqueue(&self, job_id: Uuid) -> Result<()>;
}

/// Dispatcher over the Postgres-backed claim queue.
#[derive(Clone)]
pub struct QueueDispatcher {
    jobs: Arc<dyn JobRepository>,
    notify: Arc<Notify>,
}

impl QueueDispatcher {
    /// Create a dispatcher sharing `notify` with the worker pool it should
    /// wake.
    pub fn new(jobs: Arc<dyn JobRepository>, notify: Arc<Notify>) -> Self {
        Self { jobs, notify }
    }

    /// The wake handle, for wiring a worker to this dispatcher.
    pub fn notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

#[async_trait]
impl Dispatcher for QueueDispatcher {
    async fn enqueue(&self, job_id: Uuid) -> Result<()> {
        if !self.jobs.exists(job_id).await? {
            return Err(Error::JobNotFound(job_id));
        }

        // notify_one stores a permit when no poller is waiting, so a wake
        // between a worker's empty claim and its sleep is not lost.
        self.notify.notify_one();
        debug!(subsystem = "jobs", job_id = %job_id, "job enqueued");
        Ok(())
    }
}
