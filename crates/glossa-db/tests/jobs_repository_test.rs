//! Integration tests for the PostgreSQL job repository.
//!
//! Covers the lifecycle guarantees the rest of the system leans on:
//! - Merge-upsert re-creation (absent fields keep stored values)
//! - Queue claims with stale-claim redelivery
//! - Terminal-state immutability
//! - Expiry sweeps and reclamation bookkeeping
//! - Listing with search and expiry filters
//!
//! **IMPORTANT**: These tests require a fully migrated PostgreSQL database.
//! Run migrations first: `sqlx migrate run`
//!
//! The claim tests drain the shared queue, so run single-threaded:
//! `cargo test -p glossa-db -- --ignored --test-threads=1`

use chrono::{Duration, TimeZone, Utc};
use glossa_db::test_fixtures::connect_test_pool;
use glossa_db::{
    CreateJobRequest, ExpiryFilter, JobErrorCode, JobRepository, JobStatus, ListJobsRequest,
    PgJobRepository,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

struct TestContext {
    pool: Pool<Postgres>,
    repo: PgJobRepository,
}

impl TestContext {
    async fn new() -> Self {
        dotenvy::dotenv().ok();
        let pool = connect_test_pool().await;
        Self {
            repo: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Backdate a claim stamp, simulating a worker that died mid-job.
    async fn backdate_claim(&self, id: Uuid, age: Duration) {
        sqlx::query("UPDATE jobs SET claimed_at = $1 WHERE id = $2")
            .bind(Utc::now() - age)
            .bind(id)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_upsert_creates_pending_job() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();

    let job = ctx
        .repo
        .upsert(
            &CreateJobRequest::new(id)
                .with_file_name("fresh.pdf")
                .with_owner_id("alice"),
        )
        .await
        .unwrap();

    assert_eq!(job.id, id);
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.error_code.is_none());
    assert!(job.claimed_at.is_none());

    let fetched = ctx.repo.get(id).await.unwrap().unwrap();
    assert_eq!(fetched.file_name.as_deref(), Some("fresh.pdf"));
    assert_eq!(fetched.owner_id.as_deref(), Some("alice"));
    assert!(ctx.repo.exists(id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_upsert_merges_onto_failed_job() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();

    let first = ctx
        .repo
        .upsert(
            &CreateJobRequest::new(id)
                .with_file_name("draft.pdf")
                .with_owner_id("bob"),
        )
        .await
        .unwrap();
    ctx.repo
        .fail(id, JobErrorCode::TranslationFailed)
        .await
        .unwrap();

    // Re-create with only a new file name; everything else must survive.
    let merged = ctx
        .repo
        .upsert(&CreateJobRequest::new(id).with_file_name("final.pdf"))
        .await
        .unwrap();

    assert_eq!(merged.status, JobStatus::Pending);
    assert!(merged.error_code.is_none());
    assert_eq!(merged.file_name.as_deref(), Some("final.pdf"));
    assert_eq!(merged.owner_id.as_deref(), Some("bob"));
    assert_eq!(
        merged.created_at.timestamp_millis(),
        first.created_at.timestamp_millis()
    );

    let stored = ctx.repo.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Pending);
    assert!(stored.error_code.is_none());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_claim_stamps_claim_without_running() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();

    // Claim until our job comes up; other tests may have queued rows.
    let mut claimed = None;
    while let Some(job) = ctx.repo.claim_next().await.unwrap() {
        if job.id == id {
            claimed = Some(job);
            break;
        }
    }
    let claimed = claimed.expect("queued job should be claimable");

    assert_eq!(claimed.status, JobStatus::Pending);
    assert!(claimed.claimed_at.is_some());

    // A fresh claim never hands out the same row again within the window.
    while let Some(job) = ctx.repo.claim_next().await.unwrap() {
        assert_ne!(job.id, id);
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_stale_claim_is_redelivered() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();

    // 20 minutes exceeds the default 15-minute stale window.
    ctx.backdate_claim(id, Duration::seconds(1200)).await;

    let mut redelivered = false;
    while let Some(job) = ctx.repo.claim_next().await.unwrap() {
        if job.id == id {
            redelivered = true;
            break;
        }
    }
    assert!(redelivered, "stale claim should be redelivered");
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_fresh_claim_is_not_redelivered() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();

    // 5 minutes is well inside the default 15-minute stale window.
    ctx.backdate_claim(id, Duration::seconds(300)).await;

    while let Some(job) = ctx.repo.claim_next().await.unwrap() {
        assert_ne!(job.id, id, "fresh claim must stay hidden");
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_terminal_jobs_reject_status_writes() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();
    ctx.repo.set_running(id).await.unwrap();
    ctx.repo.complete(id).await.unwrap();

    assert!(ctx.repo.set_running(id).await.is_err());
    assert!(ctx
        .repo
        .fail(id, JobErrorCode::TranslationFailed)
        .await
        .is_err());
    assert!(ctx.repo.complete(id).await.is_err());
    assert!(ctx.repo.set_page_count(id, 9).await.is_err());

    let job = ctx.repo.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_code.is_none());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_fail_records_error_code() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();

    ctx.repo
        .fail(id, JobErrorCode::OriginalNotFound)
        .await
        .unwrap();

    let job = ctx.repo.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_code, Some(JobErrorCode::OriginalNotFound));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_page_count_persists_through_completion() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();
    ctx.repo.set_running(id).await.unwrap();
    ctx.repo.set_page_count(id, 42).await.unwrap();
    ctx.repo.complete(id).await.unwrap();

    let job = ctx.repo.get(id).await.unwrap().unwrap();
    assert_eq!(job.page_count, Some(42));
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_expired_returns_oldest_first_with_limit() {
    let ctx = TestContext::new().await;

    // Anchor expiries far in the past so rows from other tests (which
    // expire near the present) never match this sweep window.
    let anchor = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
    let mut ids = Vec::new();
    for minutes in [30, 10, 20] {
        let id = Uuid::new_v4();
        ctx.repo
            .upsert(&CreateJobRequest::new(id).with_expires_at(anchor + Duration::minutes(minutes)))
            .await
            .unwrap();
        ids.push((minutes, id));
    }

    let sweep_at = anchor + Duration::hours(1);
    let expired = ctx.repo.expired(sweep_at, 2).await.unwrap();

    assert_eq!(expired.len(), 2);
    let by_minutes = |m: i64| ids.iter().find(|(mins, _)| *mins == m).unwrap().1;
    assert_eq!(expired[0].id, by_minutes(10));
    assert_eq!(expired[1].id, by_minutes(20));

    // The 30-minute row is picked up once the limit allows.
    let all = ctx.repo.expired(sweep_at, 10).await.unwrap();
    assert!(all.iter().any(|j| j.id == by_minutes(30)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_mark_reclaimed_clears_expiry() {
    let ctx = TestContext::new().await;
    let anchor = Utc.with_ymd_and_hms(2002, 1, 1, 0, 0, 0).unwrap();
    let id = Uuid::new_v4();
    ctx.repo
        .upsert(&CreateJobRequest::new(id).with_expires_at(anchor))
        .await
        .unwrap();

    let stamp = anchor + Duration::hours(2);
    ctx.repo.mark_reclaimed(id, stamp).await.unwrap();

    let job = ctx.repo.get(id).await.unwrap().unwrap();
    assert!(job.expires_at.is_none());
    assert_eq!(
        job.reclaimed_at.map(|t| t.timestamp_millis()),
        Some(stamp.timestamp_millis())
    );

    // Out of the sweep window for good.
    let swept = ctx.repo.expired(stamp + Duration::hours(1), 100).await.unwrap();
    assert!(swept.iter().all(|j| j.id != id));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_list_search_scopes_to_matching_rows() {
    let ctx = TestContext::new().await;

    // Unique marker keeps this test independent of leftover rows.
    let marker = Uuid::new_v4().simple().to_string();
    let named = Uuid::new_v4();
    ctx.repo
        .upsert(&CreateJobRequest::new(named).with_file_name(format!("report-{marker}.pdf")))
        .await
        .unwrap();
    ctx.repo
        .upsert(&CreateJobRequest::new(Uuid::new_v4()).with_file_name("unrelated.pdf"))
        .await
        .unwrap();

    let result = ctx
        .repo
        .list(&ListJobsRequest {
            search: Some(marker.clone()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.jobs[0].id, named);

    // Search terms containing LIKE wildcards match literally, not as patterns.
    let wildcard = ctx
        .repo
        .list(&ListJobsRequest {
            search: Some(format!("%{marker}%")),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(wildcard.total, 0);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_list_expiry_filters() {
    let ctx = TestContext::new().await;
    let marker = Uuid::new_v4().simple().to_string();

    let active = Uuid::new_v4();
    ctx.repo
        .upsert(
            &CreateJobRequest::new(active)
                .with_file_name(format!("live-{marker}.pdf"))
                .with_expires_at(Utc::now() + Duration::days(1)),
        )
        .await
        .unwrap();

    let expired = Uuid::new_v4();
    ctx.repo
        .upsert(
            &CreateJobRequest::new(expired)
                .with_file_name(format!("gone-{marker}.pdf"))
                .with_expires_at(Utc::now() - Duration::days(1)),
        )
        .await
        .unwrap();

    let active_only = ctx
        .repo
        .list(&ListJobsRequest {
            search: Some(marker.clone()),
            filter: ExpiryFilter::Active,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active_only.total, 1);
    assert_eq!(active_only.jobs[0].id, active);

    let expired_only = ctx
        .repo
        .list(&ListJobsRequest {
            search: Some(marker.clone()),
            filter: ExpiryFilter::Expired,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(expired_only.total, 1);
    assert_eq!(expired_only.jobs[0].id, expired);

    let both = ctx
        .repo
        .list(&ListJobsRequest {
            search: Some(marker),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(both.total, 2);
    // Newest first.
    assert_eq!(both.jobs[0].id, expired);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_list_pagination_reports_full_total() {
    let ctx = TestContext::new().await;
    let marker = Uuid::new_v4().simple().to_string();

    for i in 0..3 {
        ctx.repo
            .upsert(
                &CreateJobRequest::new(Uuid::new_v4())
                    .with_file_name(format!("page-{marker}-{i}.pdf")),
            )
            .await
            .unwrap();
    }

    let page = ctx
        .repo
        .list(&ListJobsRequest {
            limit: Some(2),
            offset: Some(0),
            search: Some(marker.clone()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.jobs.len(), 2);
    assert_eq!(page.total, 3);

    let rest = ctx
        .repo
        .list(&ListJobsRequest {
            limit: Some(2),
            offset: Some(2),
            search: Some(marker),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rest.jobs.len(), 1);
    assert_eq!(rest.total, 3);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_pending_count_tracks_queue_depth() {
    let ctx = TestContext::new().await;

    // Rows from earlier tests may still be queued, so assert on the delta.
    let before = ctx.repo.pending_count().await.unwrap();

    let id = Uuid::new_v4();
    ctx.repo.upsert(&CreateJobRequest::new(id)).await.unwrap();
    assert_eq!(ctx.repo.pending_count().await.unwrap(), before + 1);

    // A claim stamps the row but leaves it queued.
    ctx.backdate_claim(id, Duration::seconds(0)).await;
    assert_eq!(ctx.repo.pending_count().await.unwrap(), before + 1);

    ctx.repo.set_running(id).await.unwrap();
    assert_eq!(ctx.repo.pending_count().await.unwrap(), before);

    ctx.repo.complete(id).await.unwrap();
    assert_eq!(ctx.repo.pending_count().await.unwrap(), before);
}
