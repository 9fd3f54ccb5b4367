//! Core data models for glossa.
//!
//! These types are shared across all glossa crates and represent the job
//! lifecycle: one `Job` per submitted document, from PENDING through a
//! terminal COMPLETED/FAILED state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// JOB STATUS
// =============================================================================

/// Status of a translation job.
///
/// Transitions are monotone: `Pending → Running → Completed | Failed`, with
/// the shortcut `Pending → Failed` when the original artifact is missing.
/// Terminal states are only left by re-creating the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Stable string form used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a stored status string. Unknown values fall back to `Pending`
    /// so an old reader never chokes on rows written by a newer schema.
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }

    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// JOB ERROR CODES
// =============================================================================

/// Machine-readable failure kind recorded when a job enters `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobErrorCode {
    /// The original artifact was missing when processing started.
    OriginalNotFound,
    /// Extraction, chunking, translation, or rendering failed.
    TranslationFailed,
}

impl JobErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobErrorCode::OriginalNotFound => "ORIGINAL_NOT_FOUND",
            JobErrorCode::TranslationFailed => "TRANSLATION_FAILED",
        }
    }

    /// Parse a stored error code; unknown strings yield `None` rather than
    /// failing the row read.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ORIGINAL_NOT_FOUND" => Some(JobErrorCode::OriginalNotFound),
            "TRANSLATION_FAILED" => Some(JobErrorCode::TranslationFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// JOB RECORD
// =============================================================================

/// A single document's end-to-end processing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Immutable identifier assigned at creation.
    pub id: Uuid,
    pub status: JobStatus,
    /// Display name of the uploaded document, if supplied.
    pub file_name: Option<String>,
    /// Page count of the original, populated best-effort during processing.
    pub page_count: Option<i32>,
    /// Failure kind; present only while `status` is `Failed`.
    pub error_code: Option<JobErrorCode>,
    /// Opaque owner identifier, if supplied at creation.
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation of the record.
    pub updated_at: DateTime<Utc>,
    /// Absolute time after which the reaper may reclaim the artifacts.
    pub expires_at: Option<DateTime<Utc>>,
    /// Stamped when a worker claims the job from the queue.
    pub claimed_at: Option<DateTime<Utc>>,
    /// Stamped by the reaper in mark-reclaimed mode.
    pub reclaimed_at: Option<DateTime<Utc>>,
}

/// Parameters for creating (or idempotently re-creating) a job.
///
/// Absent fields mean "keep whatever is already stored" when the id exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub owner_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateJobRequest {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

impl Job {
    /// Build a brand-new PENDING record from a creation request.
    pub fn create(req: &CreateJobRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: req.id,
            status: JobStatus::Pending,
            file_name: req.file_name.clone(),
            page_count: None,
            error_code: None,
            owner_id: req.owner_id.clone(),
            created_at: now,
            updated_at: now,
            expires_at: req.expires_at,
            claimed_at: None,
            reclaimed_at: None,
        }
    }

    /// Merge a re-creation request onto an existing record.
    ///
    /// Fields absent from the request keep their stored values; supplied
    /// fields replace them. Status always resets to PENDING, `updated_at`
    /// to `now`, and the previous failure/claim/reclaim bookkeeping is
    /// cleared. `created_at` is preserved.
    pub fn merged_with(&self, req: &CreateJobRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            status: JobStatus::Pending,
            file_name: req.file_name.clone().or_else(|| self.file_name.clone()),
            page_count: self.page_count,
            error_code: None,
            owner_id: req.owner_id.clone().or_else(|| self.owner_id.clone()),
            created_at: self.created_at,
            updated_at: now,
            expires_at: req.expires_at.or(self.expires_at),
            claimed_at: None,
            reclaimed_at: None,
        }
    }

    /// Whether the job's artifacts are eligible for reclamation at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(t) if t <= now)
    }
}

// =============================================================================
// LISTING
// =============================================================================

/// Expiry-based filter for job listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryFilter {
    /// No expiry filtering.
    #[default]
    All,
    /// `expires_at` absent or in the future.
    Active,
    /// `expires_at` set and at or before now.
    Expired,
}

impl ExpiryFilter {
    /// Parse a query-string value; `None` for unknown values so the caller
    /// can reject them explicitly.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ExpiryFilter::All),
            "active" => Some(ExpiryFilter::Active),
            "expired" => Some(ExpiryFilter::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryFilter::All => "all",
            ExpiryFilter::Active => "active",
            ExpiryFilter::Expired => "expired",
        }
    }
}

/// Request parameters for listing jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Case-insensitive substring match over id, file name, and status.
    pub search: Option<String>,
    #[serde(default)]
    pub filter: ExpiryFilter,
}

/// A page of jobs, newest first, plus the total count matching the filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub total: i64,
}
