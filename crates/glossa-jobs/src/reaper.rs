//! TTL reaper: periodic reclamation of expired job artifacts.
//!
//! A sweep queries for jobs with `expires_at <= now` (ascending, batched)
//! and deletes both artifacts for each. The job record itself is never
//! deleted; what happens to it is a [`ReclaimMode`] choice. Deletion is not
//! gated on status, so a sweep can race an in-flight translation on the
//! same id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use glossa_core::{defaults, JobRepository, Result};
use glossa_db::BlobStore;

/// What a sweep does to the job record after deleting its artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReclaimMode {
    /// Delete artifacts only; the record keeps its expiry and stays
    /// eligible on every subsequent sweep (deletes are idempotent no-ops).
    #[default]
    BlobsOnly,
    /// Additionally stamp `reclaimed_at` and clear `expires_at`, removing
    /// the job from future sweeps.
    MarkReclaimed,
}

impl ReclaimMode {
    /// Parse a configuration value; `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blobs-only" => Some(ReclaimMode::BlobsOnly),
            "mark-reclaimed" => Some(ReclaimMode::MarkReclaimed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReclaimMode::BlobsOnly => "blobs-only",
            ReclaimMode::MarkReclaimed => "mark-reclaimed",
        }
    }
}

/// Configuration for the TTL reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Whether the periodic sweep runs at all.
    pub enabled: bool,
    /// Seconds between sweeps.
    pub interval_secs: u64,
    /// Maximum expired jobs processed per sweep.
    pub batch_limit: i64,
    /// Record handling after artifact deletion.
    pub reclaim_mode: ReclaimMode,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: defaults::REAPER_INTERVAL_SECS,
            batch_limit: defaults::REAPER_BATCH_LIMIT,
            reclaim_mode: ReclaimMode::default(),
        }
    }
}

impl ReaperConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REAPER_ENABLED` | `true` | Enable/disable the periodic sweep |
    /// | `REAPER_INTERVAL_SECS` | `3600` | Seconds between sweeps |
    /// | `REAPER_BATCH_LIMIT` | `100` | Max expired jobs per sweep |
    /// | `REAPER_RECLAIM_MODE` | `blobs-only` | `blobs-only` or `mark-reclaimed` |
    pub fn from_env() -> Self {
        let enabled = std::env::var("REAPER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let interval_secs = std::env::var("REAPER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::REAPER_INTERVAL_SECS);

        let batch_limit = std::env::var("REAPER_BATCH_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::REAPER_BATCH_LIMIT);

        let reclaim_mode = std::env::var("REAPER_RECLAIM_MODE")
            .ok()
            .and_then(|v| {
                let mode = ReclaimMode::parse(&v);
                if mode.is_none() {
                    warn!(value = %v, "unknown REAPER_RECLAIM_MODE, using default");
                }
                mode
            })
            .unwrap_or_default();

        Self {
            enabled,
            interval_secs,
            batch_limit,
            reclaim_mode,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_batch_limit(mut self, limit: i64) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn with_reclaim_mode(mut self, mode: ReclaimMode) -> Self {
        self.reclaim_mode = mode;
        self
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Jobs whose artifacts were reclaimed this sweep.
    pub processed: usize,
    /// Jobs where reclamation failed; they stay eligible for the next sweep.
    pub failed: usize,
}

/// Handle for controlling a running reaper.
pub struct ReaperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReaperHandle {
    /// Signal the reaper to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| glossa_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }
}

/// Periodic TTL sweep over expired jobs.
pub struct Reaper {
    jobs: Arc<dyn JobRepository>,
    blobs: BlobStore,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(jobs: Arc<dyn JobRepository>, blobs: BlobStore, config: ReaperConfig) -> Self {
        Self {
            jobs,
            blobs,
            config,
        }
    }

    /// Run one sweep at the wall clock's now.
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep at an explicit point in time.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let expired = self.jobs.expired(now, self.config.batch_limit).await?;
        if expired.is_empty() {
            debug!(subsystem = "reaper", "sweep found no expired jobs");
            return Ok(SweepReport::default());
        }

        let mut report = SweepReport::default();
        for job in &expired {
            match self.reclaim(job.id, now).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(
                        subsystem = "reaper",
                        job_id = %job.id,
                        error = %e,
                        "failed to reclaim job artifacts"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            subsystem = "reaper",
            processed = report.processed,
            failed = report.failed,
            reclaim_mode = self.config.reclaim_mode.as_str(),
            "sweep finished"
        );
        Ok(report)
    }

    /// Delete both artifacts for one expired job, then apply the reclaim
    /// mode. The record itself is never deleted.
    async fn reclaim(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.blobs.delete_original(job_id).await?;
        self.blobs.delete_translated(job_id).await?;

        if self.config.reclaim_mode == ReclaimMode::MarkReclaimed {
            self.jobs.mark_reclaimed(job_id, now).await?;
        }
        debug!(subsystem = "reaper", job_id = %job_id, "job artifacts reclaimed");
        Ok(())
    }

    /// Start the periodic sweep and return a handle for control.
    pub fn start(self) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            if !self.config.enabled {
                info!(subsystem = "reaper", "reaper disabled, not starting");
                return;
            }

            info!(
                subsystem = "reaper",
                interval_secs = self.config.interval_secs,
                batch_limit = self.config.batch_limit,
                reclaim_mode = self.config.reclaim_mode.as_str(),
                "reaper started"
            );

            // The first tick fires immediately, which catches up on
            // expiries accumulated while the process was down.
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(self.config.interval_secs));

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(subsystem = "reaper", "reaper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep().await {
                            error!(subsystem = "reaper", error = %e, "sweep failed");
                        }
                    }
                }
            }

            info!(subsystem = "reaper", "reaper stopped");
        });

        ReaperHandle { shutdown_tx }
    }
}
