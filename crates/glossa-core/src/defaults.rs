//! Centralized default constants for the glossa system.
//!
//! **This module is the single source of truth** for all shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// CHUNKING
// =============================================================================

/// Maximum characters per chunk handed to the translation backend.
///
/// Counted in Unicode scalar values, not bytes. Paragraphs are never split,
/// so a single paragraph longer than this still becomes one chunk.
pub const MAX_CHUNK_CHARS: usize = 3000;

// =============================================================================
// TRANSLATION
// =============================================================================

/// Default OpenAI-compatible chat completions base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default translation model slug.
pub const TRANSLATE_MODEL: &str = "gpt-4.1-mini";

/// Default source language for the translation prompt.
pub const SOURCE_LANG: &str = "English";

/// Default target language for the translation prompt.
pub const TARGET_LANG: &str = "Korean";

/// Sampling temperature for translation requests. Kept low so the model
/// stays literal instead of paraphrasing.
pub const TRANSLATE_TEMPERATURE: f32 = 0.1;

/// HTTP transport timeout for a single translation request in seconds.
pub const TRANSLATE_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// RETENTION
// =============================================================================

/// Default job retention window in days. `0` disables expiry entirely
/// (jobs are created without an expiry timestamp).
pub const JOB_TTL_DAYS: i64 = 7;

/// Default reaper sweep period in seconds (1 hour).
pub const REAPER_INTERVAL_SECS: u64 = 3600;

/// Default maximum expired jobs processed per reaper sweep.
pub const REAPER_BATCH_LIMIT: i64 = 100;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default job worker poll interval in milliseconds.
///
/// The worker also wakes immediately on dispatcher notification; this
/// interval only bounds the latency of picking up work enqueued by another
/// process (or redelivered after a stale claim).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Default maximum concurrent jobs per worker process.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Age in seconds after which an unfinished claim is considered stale and
/// the job is redelivered to another worker.
pub const JOB_STALE_CLAIM_SECS: u64 = 900;

/// Default worker event broadcast channel capacity.
pub const WORKER_EVENT_CAPACITY: usize = 256;

/// Per-command timeout for external extraction tools (seconds).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for the job listing endpoint.
pub const PAGE_LIMIT: i64 = 50;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

// =============================================================================
// STORAGE
// =============================================================================

/// Default filesystem blob storage root.
pub const DATA_DIR: &str = "/data";

/// Subdirectory for uploaded originals under the storage root.
pub const ORIGINAL_DIR: &str = "original";

/// Subdirectory for rendered translations under the storage root.
pub const TRANSLATED_DIR: &str = "translated";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8000;

/// Maximum upload size in bytes (50 MB), enforced as a request body limit.
pub const MAX_UPLOAD_SIZE_BYTES: usize = 50 * 1024 * 1024;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

// =============================================================================
// PDF RENDERING
// =============================================================================

/// A4 page width in PDF points.
pub const PDF_PAGE_WIDTH: f64 = 595.0;

/// A4 page height in PDF points.
pub const PDF_PAGE_HEIGHT: f64 = 842.0;

/// Page margin in PDF points (1 inch).
pub const PDF_MARGIN: f64 = 72.0;

/// Baseline-to-baseline line height in PDF points.
pub const PDF_LINE_HEIGHT: f64 = 14.0;

/// Body font size in PDF points.
pub const PDF_FONT_SIZE: f64 = 11.0;

/// Maximum characters per rendered line before wrapping.
pub const PDF_MAX_CHARS_PER_LINE: usize = 80;
