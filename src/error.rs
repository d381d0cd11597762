//! Error types for the paper-summarizer library.
//!
//! Three error types reflect three distinct failure policies:
//!
//! * [`ExtractError`] — **Recovered**: the PDF could not be read or decoded.
//!   The extraction stage logs it and hands an empty string to the prompt, so
//!   a paper with an unreadable PDF is still summarised from its title.
//!
//! * [`InferenceError`] — **Fatal to the run**: the chat endpoint could not
//!   produce a summary. No retry is attempted.
//!
//! * [`SummaryError`] — the single failure channel of a run, carried inside
//!   [`crate::summarize::RunOutcome::Failed`]. It wraps inference failures and
//!   adds the configuration and host-side failures.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain text from a PDF.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be read from local storage.
    #[error("Failed to read PDF '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a PDF the decoder can walk.
    #[error("Failed to decode PDF: {0}")]
    Decode(#[from] lopdf::Error),

    /// The document is encrypted; no password is ever supplied.
    #[error("PDF is encrypted")]
    Encrypted,

    /// A character map or font referenced by the document is unavailable.
    #[error("PDF resource unavailable: {0}")]
    Resource(#[from] pdf_resources::ResourceError),

    /// The blocking decode task did not complete.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Failure of the single chat-completion call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Connection refused, DNS failure, timeout, or body read error.
    #[error("Request to '{endpoint}' failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-2xx status.
    #[error("Endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body is not JSON, or not the expected shape.
    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    /// The response has no `message.content` field.
    #[error("Response has no message content")]
    MissingContent,
}

impl InferenceError {
    /// `true` when the request hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, InferenceError::Request { source, .. } if source.is_timeout())
    }
}

/// Why a summarization run ended in the failed state.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// A preference value is unusable (e.g. a non-positive page count).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The chat endpoint did not produce a summary.
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// The host refused to persist the updated document.
    #[error("Failed to update document '{title}': {detail}")]
    DocumentUpdate { title: String, detail: String },

    /// A host collaborator failed outside the document update.
    #[error("Host error: {0}")]
    Host(String),
}
