//! PDF text extraction using `pdftotext`/`pdfinfo` (poppler-utils).

use std::io::Write;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use glossa_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use glossa_core::{DocumentExtractor, Error, Result, PARAGRAPH_SEPARATOR};

/// Extracts text and page counts from PDF bytes using the poppler tools,
/// each invocation guarded by a per-command timeout.
///
/// Extracted text is normalized to the blank-line paragraph convention:
/// form-feed page separators split pages, blank pages are dropped, and the
/// remaining pages are re-joined with blank lines.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Whether the poppler binaries are available on this host.
    pub async fn health_check(&self) -> bool {
        match Command::new("pdftotext").arg("-v").output().await {
            Ok(output) => {
                // pdftotext -v prints its version and exits with 0 or 99
                // depending on the build; both mean the binary exists.
                output.status.success() || output.status.code() == Some(99)
            }
            Err(_) => false,
        }
    }

    /// Reject payloads that cannot be a PDF before spawning anything.
    fn validate(data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "cannot extract text from an empty document".to_string(),
            ));
        }
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidInput(
                "not a valid PDF (missing %PDF header)".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the payload to a temp file for the poppler tools to read.
    fn write_temp(data: &[u8]) -> Result<NamedTempFile> {
        let mut tmpfile = NamedTempFile::new()
            .map_err(|e| Error::Extraction(format!("failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(data)
            .map_err(|e| Error::Extraction(format!("failed to write temp file: {}", e)))?;
        Ok(tmpfile)
    }
}

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!(
                "external command timed out after {}s",
                timeout_secs
            ))
        })?
        .map_err(|e| Error::Extraction(format!("failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Normalize `pdftotext` output to the blank-line paragraph convention.
fn normalize_pages(raw: &str) -> String {
    raw.split('\u{0C}')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

/// Page count from `pdfinfo` output (`Pages:          42`).
fn parse_page_count(output: &str) -> Option<i32> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() == "Pages" {
            value.trim().parse::<i32>().ok()
        } else {
            None
        }
    })
}

#[async_trait]
impl DocumentExtractor for PdfTextExtractor {
    async fn extract_text(&self, data: &[u8]) -> Result<String> {
        Self::validate(data)?;
        let tmpfile = Self::write_temp(data)?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let raw = run_cmd_with_timeout(
            Command::new("pdftotext").arg(&tmp_path).arg("-"),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await?;

        let text = normalize_pages(&raw);
        debug!(
            subsystem = "jobs",
            bytes = data.len(),
            chars = text.chars().count(),
            "pdf text extracted"
        );
        Ok(text)
    }

    async fn page_count(&self, data: &[u8]) -> Result<i32> {
        Self::validate(data)?;
        let tmpfile = Self::write_temp(data)?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let output = run_cmd_with_timeout(
            Command::new("pdfinfo").arg(&tmp_path),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await?;

        parse_page_count(&output)
            .ok_or_else(|| Error::Extraction("pdfinfo output contained no page count".to_string()))
    }
}
