//! Core traits for glossa abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Durable store of job records; the source of truth for the state machine.
///
/// All mutating operations are atomic single-row writes with last-write-wins
/// semantics and refresh `updated_at`. The status setters enforce
/// monotonicity: they return `Error::Job` when asked to move a job out of a
/// terminal state (only `upsert` re-creation can do that).
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a job, or merge onto an existing record with the same id
    /// (idempotent re-submission). Returns the stored record.
    async fn upsert(&self, req: &CreateJobRequest) -> Result<Job>;

    /// Get a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Whether a record exists for this id.
    async fn exists(&self, job_id: Uuid) -> Result<bool>;

    /// Atomically claim the oldest PENDING job whose claim is free or
    /// stale. Stamps `claimed_at`; the status stays PENDING until the
    /// handler passes its preconditions.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Transition a job to RUNNING.
    async fn set_running(&self, job_id: Uuid) -> Result<()>;

    /// Transition a job to COMPLETED.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Transition a job to FAILED with the given error kind.
    async fn fail(&self, job_id: Uuid, code: JobErrorCode) -> Result<()>;

    /// Record the extracted page count. Does not change status.
    async fn set_page_count(&self, job_id: Uuid, page_count: i32) -> Result<()>;

    /// Jobs with `expires_at <= now`, ascending by `expires_at`, capped at
    /// `limit`. Jobs without an expiry never appear.
    async fn expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>>;

    /// Clear a job's expiry and stamp `reclaimed_at` after the reaper has
    /// deleted its artifacts.
    async fn mark_reclaimed(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Count of PENDING jobs.
    async fn pending_count(&self) -> Result<i64>;

    /// List jobs newest-first with pagination, search, and expiry filter.
    async fn list(&self, req: &ListJobsRequest) -> Result<ListJobsResponse>;
}

// =============================================================================
// TRANSLATION
// =============================================================================

/// External text-translation capability.
///
/// One call per chunk, synchronous from the caller's point of view, no
/// built-in retry: failures propagate as-is.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate plain text, preserving paragraph structure.
    async fn translate(&self, text: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

// =============================================================================
// DOCUMENT ADAPTERS
// =============================================================================

/// Extracts plain text (and optionally a page count) from document bytes.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Full text with pages joined by blank lines.
    async fn extract_text(&self, data: &[u8]) -> Result<String>;

    /// Number of pages in the document.
    async fn page_count(&self, data: &[u8]) -> Result<i32>;
}

/// Renders plain text back into document bytes.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render paragraph-structured text into a document. Empty text must
    /// yield a valid (empty) document, not an error.
    async fn render_text(&self, text: &str) -> Result<Vec<u8>>;
}
