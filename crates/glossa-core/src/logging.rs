//! Structured logging schema and field name constants for glossa.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (chunks, rows) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → job → sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "storage", "translate", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "worker", "reaper", "openai", "blob_store"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "upsert", "claim_next", "sweep", "translate_chunk"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job status after a transition.
pub const JOB_STATUS: &str = "job_status";

/// Error code recorded on a failed job.
pub const ERROR_CODE: &str = "error_code";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of chunks produced or translated for a document.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Index of the chunk currently being translated (0-based).
pub const CHUNK_INDEX: &str = "chunk_index";

/// Page count extracted from a document.
pub const PAGE_COUNT: &str = "page_count";

/// Payload size in bytes (uploads, artifacts).
pub const BYTES: &str = "bytes";

/// Number of jobs touched by a sweep or listing.
pub const JOB_COUNT: &str = "job_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Translation fields ────────────────────────────────────────────────────

/// Model name used for translation.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
