//! The translation orchestrator: processes one claimed job end to end.
//!
//! Pipeline: verify the original artifact exists → RUNNING → extract text
//! and (best-effort) page count → chunk → translate chunks in order →
//! reassemble → render → persist the translated artifact → COMPLETED.
//!
//! The handler owns every status write, including both failure kinds:
//! a missing original fails the job as `ORIGINAL_NOT_FOUND` without ever
//! entering RUNNING; anything after that fails it as `TRANSLATION_FAILED`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use glossa_core::{
    DocumentExtractor, DocumentRenderer, JobErrorCode, JobRepository, ParagraphChunker, Result,
    TranslationBackend, PARAGRAPH_SEPARATOR,
};
use glossa_db::BlobStore;

use crate::handler::{JobContext, JobHandler, JobResult};

/// Orchestrates the document translation pipeline for one job.
pub struct TranslateHandler {
    jobs: Arc<dyn JobRepository>,
    blobs: BlobStore,
    translator: Arc<dyn TranslationBackend>,
    extractor: Arc<dyn DocumentExtractor>,
    renderer: Arc<dyn DocumentRenderer>,
    chunker: ParagraphChunker,
}

impl TranslateHandler {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        blobs: BlobStore,
        translator: Arc<dyn TranslationBackend>,
        extractor: Arc<dyn DocumentExtractor>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            jobs,
            blobs,
            translator,
            extractor,
            renderer,
            chunker: ParagraphChunker::default(),
        }
    }

    /// Override the default chunking budget.
    pub fn with_chunker(mut self, chunker: ParagraphChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Record the failure kind and report it to the worker.
    async fn fail_with(&self, job_id: Uuid, code: JobErrorCode, reason: String) -> JobResult {
        if let Err(e) = self.jobs.fail(job_id, code).await {
            error!(
                subsystem = "jobs",
                job_id = %job_id,
                error = %e,
                "failed to record job failure"
            );
        }
        JobResult::Failed(reason)
    }

    /// The pipeline proper, entered only after the original-exists check.
    async fn translate(&self, job_id: Uuid) -> Result<()> {
        self.jobs.set_running(job_id).await?;
        let original = self.blobs.read_original(job_id).await?;
        debug!(
            subsystem = "jobs",
            job_id = %job_id,
            bytes = original.len(),
            "original artifact loaded"
        );

        // Best-effort: a document without a readable page table still
        // translates fine, the field just stays absent.
        let page_count = match self.extractor.page_count(&original).await {
            Ok(pages) => Some(pages),
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    error = %e,
                    "page count extraction failed"
                );
                None
            }
        };

        let text = self.extractor.extract_text(&original).await?;
        let chunks = self.chunker.chunk(&text);
        debug!(
            subsystem = "jobs",
            job_id = %job_id,
            chunk_count = chunks.len(),
            model = self.translator.model_name(),
            "document chunked"
        );

        // Sequential, in order; the first failure aborts the job and no
        // partial artifact is ever written.
        let mut translated = Vec::with_capacity(chunks.len());
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            let output = self.translator.translate(chunk).await.map_err(|e| {
                warn!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    chunk_index,
                    error = %e,
                    "chunk translation failed"
                );
                e
            })?;
            translated.push(output);
        }

        let document = translated.join(PARAGRAPH_SEPARATOR);
        let rendered = self.renderer.render_text(&document).await?;
        self.blobs.save_translated(job_id, &rendered).await?;

        if let Some(pages) = page_count {
            // Best-effort, and ordered before the terminal write because
            // COMPLETED rejects further updates.
            if let Err(e) = self.jobs.set_page_count(job_id, pages).await {
                warn!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    error = %e,
                    "failed to persist page count"
                );
            }
        }

        self.jobs.complete(job_id).await?;
        info!(
            subsystem = "jobs",
            job_id = %job_id,
            chunk_count = chunks.len(),
            page_count = page_count,
            "translation complete"
        );
        Ok(())
    }
}

#[async_trait]
impl JobHandler for TranslateHandler {
    async fn handle(&self, ctx: JobContext) -> JobResult {
        let job_id = ctx.job_id();

        // Precondition, checked before any RUNNING transition: a missing
        // upload fails the job without a processing phase.
        match self.blobs.original_exists(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    "original artifact missing"
                );
                return self
                    .fail_with(
                        job_id,
                        JobErrorCode::OriginalNotFound,
                        format!("original artifact not found for job {}", job_id),
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .fail_with(
                        job_id,
                        JobErrorCode::TranslationFailed,
                        format!("storage check failed: {}", e),
                    )
                    .await;
            }
        }

        match self.translate(job_id).await {
            Ok(()) => JobResult::Success,
            Err(e) => {
                self.fail_with(job_id, JobErrorCode::TranslationFailed, e.to_string())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glossa_core::{CreateJobRequest, Error, JobStatus};
    use glossa_db::test_fixtures::{MemoryJobRepository, MockStorageBackend};
    use glossa_translate::MockTranslator;

    /// Extractor fake: treats the artifact bytes as UTF-8 text.
    struct TextExtractor {
        pages: i32,
        fail_page_count: bool,
    }

    impl TextExtractor {
        fn new(pages: i32) -> Self {
            Self {
                pages,
                fail_page_count: false,
            }
        }

        fn without_page_table(mut self) -> Self {
            self.fail_page_count = true;
            self
        }
    }

    #[async_trait]
    impl DocumentExtractor for TextExtractor {
        async fn extract_text(&self, data: &[u8]) -> Result<String> {
            Ok(String::from_utf8_lossy(data).into_owned())
        }

        async fn page_count(&self, _data: &[u8]) -> Result<i32> {
            if self.fail_page_count {
                Err(Error::Extraction("no page table".to_string()))
            } else {
                Ok(self.pages)
            }
        }
    }

    /// Renderer fake: the rendered artifact is just the text bytes.
    struct TextRenderer;

    #[async_trait]
    impl DocumentRenderer for TextRenderer {
        async fn render_text(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    struct Fixture {
        repo: Arc<MemoryJobRepository>,
        backend: Arc<MockStorageBackend>,
        blobs: BlobStore,
        translator: MockTranslator,
    }

    impl Fixture {
        fn new(translator: MockTranslator) -> Self {
            let repo = Arc::new(MemoryJobRepository::new());
            let backend = Arc::new(MockStorageBackend::new());
            let blobs = BlobStore::new(backend.clone());
            Self {
                repo,
                backend,
                blobs,
                translator,
            }
        }

        fn handler(&self, extractor: TextExtractor, max_chunk_chars: usize) -> TranslateHandler {
            TranslateHandler::new(
                self.repo.clone(),
                self.blobs.clone(),
                Arc::new(self.translator.clone()),
                Arc::new(extractor),
                Arc::new(TextRenderer),
            )
            .with_chunker(ParagraphChunker::with_max_chars(max_chunk_chars))
        }

        async fn create_job(&self) -> Uuid {
            let job = self
                .repo
                .upsert(&CreateJobRequest::new(Uuid::new_v4()))
                .await
                .unwrap();
            job.id
        }

        fn seed_original(&self, job_id: Uuid, text: &str) {
            self.backend
                .put(&self.blobs.original_path(job_id), text.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_missing_original_fails_without_running() {
        let fx = Fixture::new(MockTranslator::new());
        let job_id = fx.create_job().await;
        let handler = fx.handler(TextExtractor::new(1), 3000);

        let job = fx.repo.get(job_id).await.unwrap().unwrap();
        let result = handler.handle(JobContext::new(job)).await;

        assert!(matches!(result, JobResult::Failed(ref msg) if msg.contains("not found")));
        let stored = fx.repo.get(job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error_code, Some(JobErrorCode::OriginalNotFound));

        // No RUNNING phase, no translation, no artifact.
        assert_eq!(
            fx.repo.status_history(job_id),
            vec![JobStatus::Pending, JobStatus::Failed]
        );
        assert_eq!(fx.translator.call_count(), 0);
        assert_eq!(fx.backend.call_count("write"), 0);
    }

    #[tokio::test]
    async fn test_successful_translation_renders_artifact() {
        let fx = Fixture::new(MockTranslator::new().with_echo_prefix("[ko] "));
        let job_id = fx.create_job().await;
        fx.seed_original(job_id, "Hello.\n\nWorld.");
        // Budget 6 splits the two 6-char paragraphs into separate chunks.
        let handler = fx.handler(TextExtractor::new(3), 6);

        let job = fx.repo.get(job_id).await.unwrap().unwrap();
        let result = handler.handle(JobContext::new(job)).await;
        assert!(matches!(result, JobResult::Success));

        let stored = fx.repo.get(job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.error_code.is_none());
        assert_eq!(stored.page_count, Some(3));
        assert_eq!(
            fx.repo.status_history(job_id),
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed]
        );

        assert_eq!(fx.translator.calls(), vec!["Hello.", "World."]);
        let artifact = fx.blobs.read_translated(job_id).await.unwrap();
        assert_eq!(artifact, b"[ko] Hello.\n\n[ko] World.");
    }

    #[tokio::test]
    async fn test_translation_failure_on_middle_chunk_stops_the_job() {
        let fx = Fixture::new(MockTranslator::new().fail_on_call(2));
        let job_id = fx.create_job().await;
        fx.seed_original(job_id, "First.\n\nSecond.\n\nThird.");
        // Budget 1 forces one chunk per paragraph.
        let handler = fx.handler(TextExtractor::new(1), 1);

        let job = fx.repo.get(job_id).await.unwrap().unwrap();
        let result = handler.handle(JobContext::new(job)).await;
        assert!(matches!(result, JobResult::Failed(_)));

        let stored = fx.repo.get(job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error_code, Some(JobErrorCode::TranslationFailed));

        // The third chunk is never sent and no partial artifact exists.
        assert_eq!(fx.translator.call_count(), 2);
        assert!(!fx.blobs.translated_exists(job_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_document_completes_with_empty_artifact() {
        let fx = Fixture::new(MockTranslator::new());
        let job_id = fx.create_job().await;
        fx.seed_original(job_id, "");
        let handler = fx.handler(TextExtractor::new(0), 3000);

        let job = fx.repo.get(job_id).await.unwrap().unwrap();
        let result = handler.handle(JobContext::new(job)).await;
        assert!(matches!(result, JobResult::Success));

        let stored = fx.repo.get(job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);

        // Zero chunks means zero translation calls, but a valid artifact.
        assert_eq!(fx.translator.call_count(), 0);
        assert_eq!(fx.blobs.read_translated(job_id).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn test_page_count_failure_does_not_fail_the_job() {
        let fx = Fixture::new(MockTranslator::new());
        let job_id = fx.create_job().await;
        fx.seed_original(job_id, "Only paragraph.");
        let handler = fx.handler(TextExtractor::new(0).without_page_table(), 3000);

        let job = fx.repo.get(job_id).await.unwrap().unwrap();
        let result = handler.handle(JobContext::new(job)).await;
        assert!(matches!(result, JobResult::Success));

        let stored = fx.repo.get(job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.page_count.is_none());
    }

    #[tokio::test]
    async fn test_artifact_write_failure_fails_the_job() {
        let fx = Fixture::new(MockTranslator::new());
        let job_id = fx.create_job().await;
        fx.seed_original(job_id, "Some text.");
        // `put` bypasses write, so only the translated save is affected.
        fx.backend.set_fail_writes(true);
        let handler = fx.handler(TextExtractor::new(1), 3000);

        let job = fx.repo.get(job_id).await.unwrap().unwrap();
        let result = handler.handle(JobContext::new(job)).await;
        assert!(matches!(result, JobResult::Failed(_)));

        let stored = fx.repo.get(job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error_code, Some(JobErrorCode::TranslationFailed));
        assert!(!fx.blobs.translated_exists(job_id).await.unwrap());
    }
}
