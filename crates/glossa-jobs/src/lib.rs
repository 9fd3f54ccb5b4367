//! # glossa-jobs
//!
//! Background processing for glossa.
//!
//! This crate provides:
//! - The dispatch layer: queue dispatcher, polling worker, handler contract
//! - The translation handler that drives a job from PENDING to a terminal state
//! - The retention reaper that reclaims storage for expired jobs
//! - PDF adapters for text extraction (poppler) and rendering (lopdf)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use glossa_jobs::{
//!     Dispatcher, JobWorker, PdfRenderer, PdfTextExtractor, QueueDispatcher, TranslateHandler,
//!     WorkerConfig,
//! };
//!
//! let handler = Arc::new(TranslateHandler::new(
//!     jobs.clone(),
//!     blobs,
//!     translator,
//!     Arc::new(PdfTextExtractor),
//!     Arc::new(PdfRenderer),
//! ));
//!
//! let worker = JobWorker::new(jobs.clone(), handler, WorkerConfig::from_env());
//! let dispatcher = QueueDispatcher::new(jobs, worker.wake());
//!
//! // Start worker and get handle
//! let handle = worker.start();
//!
//! // New jobs are picked up immediately
//! dispatcher.enqueue(job_id).await?;
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod adapters;
pub mod dispatch;
pub mod handler;
pub mod reaper;
pub mod translate_handler;
pub mod worker;

// Re-export core types
pub use glossa_core::*;

// Re-export job types
pub use dispatch::{Dispatcher, QueueDispatcher};
pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use translate_handler::TranslateHandler;
pub use worker::{JobWorker, WorkerConfig, WorkerEvent, WorkerHandle};

// Re-export retention types
pub use reaper::{Reaper, ReaperConfig, ReaperHandle, ReclaimMode, SweepReport};

// Re-export document adapters
pub use adapters::{PdfRenderer, PdfTextExtractor};
