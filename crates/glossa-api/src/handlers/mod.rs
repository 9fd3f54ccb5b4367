//! Handler modules for glossa-api.
//!
//! HTTP handlers for job submission, status lookup, listing, and artifact
//! download.

pub mod jobs;

pub use jobs::{
    download_translated, get_job, list_jobs, submit_job, JobListResponse, JobResponse,
    SubmitJobResponse,
};
