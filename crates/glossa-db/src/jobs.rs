//! PostgreSQL job repository.
//!
//! The `jobs` table doubles as the work queue: a claimable row is a PENDING
//! row whose `claimed_at` is unset or older than the stale-claim window.
//! Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent workers never
//! receive the same row, and a worker that dies mid-claim loses the row to
//! redelivery once its claim goes stale.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

use glossa_core::{
    defaults, CreateJobRequest, Error, ExpiryFilter, Job, JobErrorCode, JobRepository, JobStatus,
    ListJobsRequest, ListJobsResponse, Result,
};

use crate::escape_like;

/// PostgreSQL-backed implementation of [`JobRepository`].
///
/// Cloning shares the pool and the enqueue notifier.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
    notify: Arc<Notify>,
    stale_claim: Duration,
}

impl PgJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            notify: Arc::new(Notify::new()),
            stale_claim: Duration::seconds(defaults::JOB_STALE_CLAIM_SECS as i64),
        }
    }

    /// Create with a shared notifier so workers wake immediately when a
    /// dispatcher enqueues work, instead of waiting out a poll interval.
    pub fn with_notify(pool: Pool<Postgres>, notify: Arc<Notify>) -> Self {
        Self {
            pool,
            notify,
            stale_claim: Duration::seconds(defaults::JOB_STALE_CLAIM_SECS as i64),
        }
    }

    /// Override the window after which an unfinished claim counts as
    /// abandoned and the job becomes claimable again.
    pub fn with_stale_claim(mut self, window: Duration) -> Self {
        self.stale_claim = window;
        self
    }

    /// Notifier signalled whenever new work lands in the queue.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Job {
        let status: String = row.get("status");
        let error_code: Option<String> = row.get("error_code");

        Job {
            id: row.get("id"),
            status: JobStatus::parse(&status),
            file_name: row.get("file_name"),
            page_count: row.get("page_count"),
            error_code: error_code.as_deref().and_then(JobErrorCode::parse),
            owner_id: row.get("owner_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            expires_at: row.get("expires_at"),
            claimed_at: row.get("claimed_at"),
            reclaimed_at: row.get("reclaimed_at"),
        }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn upsert(&self, req: &CreateJobRequest) -> Result<Job> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Row-lock the existing record so concurrent re-submissions of the
        // same id serialize instead of clobbering each other's merge.
        let existing = sqlx::query(
            "SELECT id, status, file_name, page_count, error_code, owner_id,
                    created_at, updated_at, expires_at, claimed_at, reclaimed_at
             FROM jobs WHERE id = $1 FOR UPDATE",
        )
        .bind(req.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .map(Self::parse_job_row);

        let recreated = existing.is_some();
        let job = match existing {
            Some(ref stored) => stored.merged_with(req, now),
            None => Job::create(req, now),
        };

        sqlx::query(
            "INSERT INTO jobs (id, status, file_name, page_count, error_code, owner_id,
                               created_at, updated_at, expires_at, claimed_at, reclaimed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO UPDATE SET
                 status = EXCLUDED.status,
                 file_name = EXCLUDED.file_name,
                 page_count = EXCLUDED.page_count,
                 error_code = EXCLUDED.error_code,
                 owner_id = EXCLUDED.owner_id,
                 updated_at = EXCLUDED.updated_at,
                 expires_at = EXCLUDED.expires_at,
                 claimed_at = EXCLUDED.claimed_at,
                 reclaimed_at = EXCLUDED.reclaimed_at",
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(&job.file_name)
        .bind(job.page_count)
        .bind(job.error_code.map(|c| c.as_str()))
        .bind(&job.owner_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.expires_at)
        .bind(job.claimed_at)
        .bind(job.reclaimed_at)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        // The committed row is PENDING either way, so wake any parked worker.
        self.notify.notify_waiters();

        debug!(
            subsystem = "db",
            job_id = %job.id,
            recreated = recreated,
            "job upserted"
        );

        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(
            "SELECT id, status, file_name, page_count, error_code, owner_id,
                    created_at, updated_at, expires_at, claimed_at, reclaimed_at
             FROM jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1) AS present")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.get::<bool, _>("present"))
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let now = Utc::now();
        let stale_cutoff = now - self.stale_claim;

        // Claiming only stamps claimed_at; the job stays PENDING until the
        // handler verifies the original artifact and marks it RUNNING.
        let row = sqlx::query(
            "UPDATE jobs
             SET claimed_at = $1, updated_at = $1
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'pending'
                   AND (claimed_at IS NULL OR claimed_at < $2)
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, status, file_name, page_count, error_code, owner_id,
                       created_at, updated_at, expires_at, claimed_at, reclaimed_at",
        )
        .bind(now)
        .bind(stale_cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn set_running(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'running', updated_at = NOW()
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!(
                "cannot mark job {} running: not found or already terminal",
                id
            )));
        }
        Ok(())
    }

    async fn complete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', error_code = NULL, updated_at = NOW()
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!(
                "cannot complete job {}: not found or already terminal",
                id
            )));
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, code: JobErrorCode) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error_code = $2, updated_at = NOW()
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(id)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!(
                "cannot fail job {}: not found or already terminal",
                id
            )));
        }
        Ok(())
    }

    async fn set_page_count(&self, id: Uuid, page_count: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET page_count = $2, updated_at = NOW()
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(id)
        .bind(page_count)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!(
                "cannot set page count on job {}: not found or already terminal",
                id
            )));
        }
        Ok(())
    }

    async fn expired(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            "SELECT id, status, file_name, page_count, error_code, owner_id,
                    created_at, updated_at, expires_at, claimed_at, reclaimed_at
             FROM jobs
             WHERE expires_at IS NOT NULL AND expires_at <= $1
             ORDER BY expires_at ASC
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_job_row).collect())
    }

    async fn mark_reclaimed(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        // Clearing expires_at takes the row out of future sweeps; the record
        // itself is never deleted.
        sqlx::query(
            "UPDATE jobs SET reclaimed_at = $2, expires_at = NULL, updated_at = $2
             WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn pending_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM jobs WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.get::<i64, _>("count"))
    }

    async fn list(&self, req: &ListJobsRequest) -> Result<ListJobsResponse> {
        let limit = req.limit.unwrap_or(defaults::PAGE_LIMIT);
        let offset = req.offset.unwrap_or(defaults::PAGE_OFFSET);

        let mut conditions = Vec::new();
        let mut param_idx = 1;

        let pattern = req
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        if pattern.is_some() {
            conditions.push(format!(
                "(id::text ILIKE ${p} OR COALESCE(file_name, '') ILIKE ${p} OR status ILIKE ${p})",
                p = param_idx
            ));
            param_idx += 1;
        }

        match req.filter {
            ExpiryFilter::All => {}
            ExpiryFilter::Active => {
                conditions.push("(expires_at IS NULL OR expires_at > NOW())".to_string());
            }
            ExpiryFilter::Expired => {
                conditions.push("(expires_at IS NOT NULL AND expires_at <= NOW())".to_string());
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT id, status, file_name, page_count, error_code, owner_id,
                    created_at, updated_at, expires_at, claimed_at, reclaimed_at
             FROM jobs
             {}
             ORDER BY created_at DESC
             LIMIT ${} OFFSET ${}",
            where_clause,
            param_idx,
            param_idx + 1
        );

        let mut q = sqlx::query(&query);
        if let Some(ref p) = pattern {
            q = q.bind(p);
        }
        q = q.bind(limit).bind(offset);

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
        let jobs: Vec<Job> = rows.into_iter().map(Self::parse_job_row).collect();

        // Total uses the same filter without pagination so clients can page.
        let count_query = format!("SELECT COUNT(*) AS count FROM jobs {}", where_clause);
        let mut cq = sqlx::query(&count_query);
        if let Some(ref p) = pattern {
            cq = cq.bind(p);
        }
        let total = cq
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?
            .get::<i64, _>("count");

        Ok(ListJobsResponse { jobs, total })
    }
}
