//! Job handler contract between the worker pool and the orchestrator.

use async_trait::async_trait;
use uuid::Uuid;

use glossa_core::Job;

/// Context provided to a job handler for one claimed job.
pub struct JobContext {
    /// The job being processed, as read at claim time.
    pub job: Job,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    /// Id of the job being processed.
    pub fn job_id(&self) -> Uuid {
        self.job.id
    }
}

/// Outcome of one handler invocation.
///
/// The handler owns the terminal status writes (COMPLETED/FAILED with an
/// error kind); this result only tells the worker what happened so it can
/// log, emit events, and backstop a handler that bailed without recording
/// its own failure.
#[derive(Debug)]
pub enum JobResult {
    /// The job finished and the handler recorded COMPLETED.
    Success,
    /// The job failed with a human-readable reason.
    Failed(String),
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one claimed job end to end.
    async fn handle(&self, ctx: JobContext) -> JobResult;
}

/// No-op handler for testing worker plumbing.
pub struct NoOpHandler;

#[async_trait]
impl JobHandler for NoOpHandler {
    async fn handle(&self, _ctx: JobContext) -> JobResult {
        JobResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use glossa_core::CreateJobRequest;

    fn sample_job() -> Job {
        Job::create(
            &CreateJobRequest::new(Uuid::new_v4()).with_file_name("paper.pdf"),
            Utc::now(),
        )
    }

    #[test]
    fn test_job_context_exposes_job() {
        let job = sample_job();
        let ctx = JobContext::new(job.clone());
        assert_eq!(ctx.job_id(), job.id);
        assert_eq!(ctx.job.file_name, job.file_name);
    }

    #[tokio::test]
    async fn test_noop_handler_succeeds() {
        let handler = NoOpHandler;
        let result = handler.handle(JobContext::new(sample_job())).await;
        assert!(matches!(result, JobResult::Success));
    }

    #[test]
    fn test_job_result_debug() {
        let result = JobResult::Failed("boom".to_string());
        let debug_str = format!("{:?}", result);
        assert!(debug_str.contains("Failed"));
        assert!(debug_str.contains("boom"));
    }
}
