//! The summarization run: selection → config → extract → prompt → inference
//! → merge → persist.
//!
//! A run moves `Idle → Running → (Success | SkippedNoSelection | Failed) →
//! Idle`. Only `Running` is observable from outside while the run is alive
//! (through the shared [`InFlightCounter`]); the terminal state comes back as
//! the [`RunOutcome`]. Errors never escape as panics or `Err`s to the host,
//! they are logged with the paper title and returned as
//! [`RunOutcome::Failed`].

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::busy::InFlightCounter;
use crate::config::SummaryConfig;
use crate::error::SummaryError;
use crate::host::{Document, HostServices, UpdateOptions};
use crate::pdf::TextExtractor;
use crate::pipeline::extract::{extract_text, ExtractionRequest};
use crate::pipeline::inference::{ChatBackend, OllamaClient, SummaryRequest};
use crate::pipeline::merge::{merge_note, MergeResult};
use crate::prompts::build_prompt;

/// Whether any run is currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Inference succeeded. `note_updated` is `false` when the model returned
    /// an empty summary and nothing was written.
    Success { note_updated: bool },
    /// Zero or several papers were selected; nothing happened.
    SkippedNoSelection,
    /// The run stopped; the note is untouched.
    Failed(SummaryError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&SummaryError> {
        match self {
            RunOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Runs the pipeline against the host's current selection.
#[derive(Clone)]
pub struct Summarizer {
    host: HostServices,
    counter: Arc<InFlightCounter>,
    extractor: TextExtractor,
    backend: Arc<dyn ChatBackend>,
}

impl Summarizer {
    /// A summarizer talking to Ollama over HTTP with the bundled PDF
    /// resources.
    pub fn new(host: HostServices, counter: Arc<InFlightCounter>) -> Self {
        Self {
            host,
            counter,
            extractor: TextExtractor::bundled(),
            backend: Arc::new(OllamaClient::new()),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn counter(&self) -> &Arc<InFlightCounter> {
        &self.counter
    }

    pub fn state(&self) -> RunState {
        if self.counter.current() > 0 {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// Summarize the single selected paper.
    ///
    /// Anything but exactly one selected paper is a no-op that leaves the
    /// in-flight count alone.
    pub async fn summarize_selected(&self) -> RunOutcome {
        let mut selected = match self.host.selection.selected_documents().await {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "Failed to read the selection");
                return RunOutcome::Failed(SummaryError::Host(e.to_string()));
            }
        };
        if selected.len() != 1 {
            debug!(selected = selected.len(), "Expected exactly one selected paper, skipping");
            return RunOutcome::SkippedNoSelection;
        }
        match selected.pop() {
            Some(document) => self.summarize_document(document).await,
            None => RunOutcome::SkippedNoSelection,
        }
    }

    /// Summarize `document` and persist the merged note.
    pub async fn summarize_document(&self, document: Document) -> RunOutcome {
        let _guard = self.counter.acquire();
        info!(title = %document.title, "Start summarizing");

        let title = document.title.clone();
        match self.run(document).await {
            Ok(note_updated) => RunOutcome::Success { note_updated },
            Err(e) => {
                error!(title = %title, error = %e, "Summarization failed");
                RunOutcome::Failed(e)
            }
        }
    }

    async fn run(&self, mut document: Document) -> Result<bool, SummaryError> {
        let config = SummaryConfig::from_preferences(self.host.preferences.as_ref()).await?;
        debug!(
            model = %config.model,
            pages = config.page_limit.get(),
            style = ?config.style,
            "Loaded configuration"
        );

        let text = match self.document_path(&document).await {
            Some(path) => {
                let request = ExtractionRequest::new(path, config.page_limit);
                extract_text(&self.extractor, &request).await
            }
            None => String::new(),
        };

        let prompt = build_prompt(&document.title, config.style);
        let request = SummaryRequest::new(&prompt, &text, &config);
        let response = self.backend.complete(&request).await?;
        info!(title = %document.title, "Finished inference for {}", document.title);

        match merge_note(&document.note, &response.content, config.style) {
            MergeResult::Unchanged => {
                warn!(title = %document.title, "Summary is empty.");
                Ok(false)
            }
            MergeResult::Updated(note) => {
                document.note = note;
                self.host
                    .documents
                    .update(&document, UpdateOptions::single())
                    .await
                    .map_err(|e| SummaryError::DocumentUpdate {
                        title: document.title.clone(),
                        detail: e.to_string(),
                    })?;
                Ok(true)
            }
        }
    }

    /// Local path of the paper's PDF; `None` summarises from the title alone.
    async fn document_path(&self, document: &Document) -> Option<PathBuf> {
        let Some(file_ref) = document.file_ref.as_deref() else {
            warn!(title = %document.title, "Paper has no PDF, continuing without text");
            return None;
        };
        match self.host.files.resolve(file_ref).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(
                    title = %document.title,
                    file = file_ref,
                    error = %e,
                    "Failed to resolve PDF, continuing without text"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer")
            .field("counter", &self.counter)
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}
