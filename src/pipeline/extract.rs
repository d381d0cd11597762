//! Text extraction stage: PDF file → plain text for the prompt.
//!
//! ## Why spawn_blocking?
//!
//! Decoding content streams and font maps is CPU-bound and synchronous.
//! `tokio::task::spawn_blocking` keeps that work off the async worker
//! threads, so a large first page does not stall the host's other tasks.
//!
//! ## Failure policy
//!
//! [`extract_text`] never fails. A missing file, an encrypted or malformed
//! PDF, or a missing font resource is logged and yields an empty string; the
//! paper is then summarised from its title alone.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::PageLimit;
use crate::error::ExtractError;
use crate::pdf::TextExtractor;

/// What to extract, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub path: PathBuf,
    pub page_limit: PageLimit,
}

impl ExtractionRequest {
    pub fn new(path: impl Into<PathBuf>, page_limit: PageLimit) -> Self {
        Self {
            path: path.into(),
            page_limit,
        }
    }
}

/// Extract the text of the first pages, or return the failure.
pub async fn try_extract_text(
    extractor: &TextExtractor,
    request: &ExtractionRequest,
) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(&request.path)
        .await
        .map_err(|source| ExtractError::Io {
            path: request.path.clone(),
            source,
        })?;

    let extractor = extractor.clone();
    let limit = request.page_limit;
    tokio::task::spawn_blocking(move || extractor.extract_bytes(&bytes, limit))
        .await
        .map_err(|e| ExtractError::Task(format!("Extraction task panicked: {e}")))?
}

/// Extract the text of the first pages; failures give an empty string.
pub async fn extract_text(extractor: &TextExtractor, request: &ExtractionRequest) -> String {
    match try_extract_text(extractor, request).await {
        Ok(text) => {
            debug!(
                path = %request.path.display(),
                pages = request.page_limit.get(),
                chars = text.len(),
                "Extracted text"
            );
            text
        }
        Err(e) => {
            warn!(
                path = %request.path.display(),
                error = %e,
                "Text extraction failed, continuing without text"
            );
            String::new()
        }
    }
}
