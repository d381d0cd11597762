//! Pipeline stages of a summarization run.
//!
//! Each submodule implements exactly one step; the orchestrator in
//! [`crate::summarize`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ prompt ──▶ inference ──▶ merge
//! (lopdf)    (prompts)   (/api/chat)   (note)
//! ```
//!
//! 1. [`extract`]   — text of the first N pages; runs the decoder in
//!    `spawn_blocking`, failures give an empty string
//! 2. [`crate::prompts`] — system instruction and prompt prefix for the title
//! 3. [`inference`] — one non-streaming chat call; the only stage with network
//!    I/O
//! 4. [`merge`]     — append-only merge of the summary into the note

pub mod extract;
pub mod inference;
pub mod merge;
