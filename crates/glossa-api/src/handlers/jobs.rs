//! Translation job HTTP handlers.
//!
//! Submission accepts a PDF over multipart/form-data and answers with the job
//! id immediately; everything after that happens in the background. Status,
//! listing, and download read whatever the pipeline has produced so far.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use glossa_core::{CreateJobRequest, ExpiryFilter, Job, JobRepository, ListJobsRequest};
use glossa_jobs::Dispatcher;

use crate::{ApiError, AppState};

/// Wire representation of a job record.
///
/// Optional fields that have no value yet are omitted from the JSON rather
/// than serialized as `null`.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    /// Job identifier.
    pub job_id: Uuid,
    /// Display name of the uploaded document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Most recent lifecycle state: pending, running, completed, or failed.
    pub last_status: String,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub last_updated_at: DateTime<Utc>,
    /// Page count of the original, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    /// Failure kind for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Opaque owner identifier supplied at submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// When the retention reaper may reclaim this job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            file_name: job.file_name,
            last_status: job.status.to_string(),
            created_at: job.created_at,
            last_updated_at: job.updated_at,
            page_count: job.page_count,
            error_code: job.error_code.map(|code| code.to_string()),
            owner_id: job.owner_id,
            expires_at: job.expires_at,
        }
    }
}

/// Response from job submission.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    /// Identifier of the newly created job.
    pub job_id: Uuid,
}

/// One page of the job listing.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    /// Jobs on this page, newest first.
    pub jobs: Vec<JobResponse>,
    /// Total number of jobs matching the query, ignoring pagination.
    pub total: i64,
}

/// Query parameters for the job listing.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListJobsQuery {
    /// Page size (default 50).
    pub limit: Option<i64>,
    /// Rows to skip (default 0).
    pub offset: Option<i64>,
    /// Case-insensitive match against id, file name, and status.
    pub search: Option<String>,
    /// Expiry filter: all, active, or expired (default all).
    pub filter: Option<String>,
}

/// Submit a PDF for translation.
///
/// Accepts multipart/form-data and returns the job id as soon as the original
/// is persisted and the PENDING record exists; translation runs in the
/// background. Poll `GET /api/v1/jobs/{id}` for progress.
///
/// # Multipart Fields
/// - `file`: PDF document, content type `application/pdf` (required)
/// - `file_name`: display-name override (optional, defaults to the upload's filename)
/// - `owner_id`: opaque owner identifier (optional)
///
/// # Returns
/// - 200 OK with the job id
/// - 400 Bad Request if the file part is missing, empty, or not a PDF
#[utoipa::path(post, path = "/api/v1/jobs", tag = "Jobs",
    responses((status = 200, description = "Job created", body = SubmitJobResponse),
        (status = 400, description = "Missing, empty, or non-PDF upload")))]
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: axum::extract::Multipart,
) -> Result<Json<SubmitJobResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut upload_name: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut owner_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(|c| c.to_string());
                if content_type.as_deref() != Some("application/pdf") {
                    return Err(ApiError::BadRequest(
                        "File must be uploaded as application/pdf".to_string(),
                    ));
                }
                upload_name = field.file_name().map(|n| n.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            Some("file_name") => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                if !val.trim().is_empty() {
                    file_name = Some(val.trim().to_string());
                }
            }
            Some("owner_id") => {
                let val = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                if !val.trim().is_empty() {
                    owner_id = Some(val.trim().to_string());
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    let data = file_data
        .ok_or_else(|| ApiError::BadRequest("Missing file in multipart form".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".into()));
    }

    let job_id = Uuid::new_v4();

    // Order matters: the artifact must be durable before the record exists,
    // and the record before the queue is woken. A worker that picks the job
    // up immediately finds everything in place.
    state.blobs.save_original(job_id, &data).await?;

    let mut request = CreateJobRequest::new(job_id);
    if let Some(name) = file_name.or(upload_name) {
        request = request.with_file_name(name);
    }
    if let Some(owner) = owner_id {
        request = request.with_owner_id(owner);
    }
    if state.job_ttl_days > 0 {
        request = request.with_expires_at(Utc::now() + Duration::days(state.job_ttl_days));
    }
    state.jobs.upsert(&request).await?;
    state.dispatcher.enqueue(job_id).await?;

    info!(
        subsystem = "api",
        job_id = %job_id,
        bytes = data.len(),
        "translation job submitted"
    );
    Ok(Json(SubmitJobResponse { job_id }))
}

/// List translation jobs, newest first.
///
/// # Returns
/// - 200 OK with one page of jobs plus the total match count
/// - 400 Bad Request for an unknown `filter` value
#[utoipa::path(get, path = "/api/v1/jobs", tag = "Jobs", params(ListJobsQuery),
    responses((status = 200, description = "One page of jobs", body = JobListResponse),
        (status = 400, description = "Unknown filter value")))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListResponse>, ApiError> {
    let filter = match query.filter.as_deref() {
        None => ExpiryFilter::default(),
        Some(raw) => ExpiryFilter::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Unknown filter '{}': expected all, active, or expired",
                raw
            ))
        })?,
    };

    let page = state
        .jobs
        .list(&ListJobsRequest {
            limit: query.limit,
            offset: query.offset,
            search: query.search,
            filter,
        })
        .await?;

    Ok(Json(JobListResponse {
        jobs: page.jobs.into_iter().map(JobResponse::from).collect(),
        total: page.total,
    }))
}

/// Fetch one job by id.
///
/// # Returns
/// - 200 OK with the job record
/// - 404 Not Found for an unknown job id
#[utoipa::path(get, path = "/api/v1/jobs/{id}", tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    responses((status = 200, description = "Job record", body = JobResponse),
        (status = 404, description = "Unknown job")))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", id)))?;
    Ok(Json(JobResponse::from(job)))
}

/// Download the translated document for a completed job.
///
/// # Returns
/// - 200 OK with the PDF as an attachment
/// - 404 Not Found while the job is unknown, still processing, or failed
#[utoipa::path(get, path = "/api/v1/jobs/{id}/download", tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job id")),
    responses((status = 200, description = "Translated PDF document"),
        (status = 404, description = "No translated document for this job")))]
pub async fn download_translated(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // One check covers every miss: unknown job, job still in flight, and
    // failed job all mean the artifact does not exist.
    if !state.blobs.translated_exists(id).await? {
        return Err(ApiError::NotFound(format!(
            "No translated document for job {}",
            id
        )));
    }
    let bytes = state.blobs.read_translated(id).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"translated_{}.pdf\"", id),
        ),
    ];
    Ok((headers, bytes))
}
