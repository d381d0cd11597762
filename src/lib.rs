//! # paper-summarizer
//!
//! Summarise an academic paper with a local chat model and merge the summary
//! into the paper's note.
//!
//! ## Why this crate?
//!
//! Reference managers keep a free-form note per paper. This crate fills it
//! with a short summary written by a model running on the user's own machine
//! (Ollama), fed with the text of the paper's first pages. Existing note
//! content is never rewritten: the summary is only ever appended.
//!
//! ## Pipeline Overview
//!
//! ```text
//! selected paper
//!  │
//!  ├─ 1. Config    preferences → SummaryConfig (fails fast on bad values)
//!  ├─ 2. Extract   first N pages of the PDF → text (lopdf, spawn_blocking)
//!  ├─ 3. Prompt    system instruction + request + title + text
//!  ├─ 4. Infer     one POST to /api/chat, stream: false
//!  ├─ 5. Merge     append-only, `<md>` marker or plain label
//!  └─ 6. Persist   single, immediate document update
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paper_summarizer::{Extension, HostServices, InFlightCounter, Summarizer, Trigger};
//!
//! # async fn run(host: HostServices) {
//! let counter = Arc::new(InFlightCounter::default());
//! let extension = Extension::new(Summarizer::new(host, counter));
//!
//! let trigger = Trigger::Command { event: "summarize_selected_paper".into() };
//! if let Some(outcome) = extension.handle(trigger).await {
//!     println!("{outcome:?}");
//! }
//! # }
//! ```
//!
//! The host supplies its collaborators through [`HostServices`]; see
//! [`host`] for the traits.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod busy;
pub mod config;
pub mod error;
pub mod extension;
pub mod host;
pub mod pdf;
pub mod pipeline;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use busy::{BusyIndicator, InFlightCounter, InFlightGuard};
pub use config::{PageLimit, Style, SummaryConfig, SummaryConfigBuilder};
pub use error::{ExtractError, InferenceError, SummaryError};
pub use extension::{Extension, ExtensionManifest, Trigger};
pub use host::{Document, HostServices};
pub use pdf::TextExtractor;
pub use pipeline::inference::{ChatBackend, OllamaClient};
pub use pipeline::merge::{merge_note, MergeResult};
pub use prompts::{build_prompt, Prompt};
pub use summarize::{RunOutcome, RunState, Summarizer};
