//! Host collaborator traits.
//!
//! The summarizer runs inside a reference-manager host that owns the paper
//! records, the preference store and persistence. Each concern the pipeline
//! consumes is a small object-safe trait so hosts (and tests) can plug in their
//! own implementation:
//!
//! | Trait | Host concern |
//! |-------|--------------|
//! | [`SelectionSource`] | which papers are currently selected |
//! | [`PreferenceStore`] | extension preferences (style, model, page count) |
//! | [`FileResolver`] | stored file reference → readable local path |
//! | [`DocumentStore`] | persist the updated paper |
//! | [`crate::busy::BusyIndicator`] | busy-state counter shown by the UI |
//!
//! Logging goes through `tracing`; the host installs whatever subscriber it
//! likes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A paper record as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Stored reference to the main PDF (URL or path), if any.
    pub file_ref: Option<String>,
    /// Free-form note; may be empty or start with the structured marker.
    #[serde(default)]
    pub note: String,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            file_ref: None,
            note: String::new(),
        }
    }

    pub fn with_file(mut self, file_ref: impl Into<String>) -> Self {
        self.file_ref = Some(file_ref.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Error reported by a host collaborator.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A stored preference value: booleans for toggles, strings for options and
/// free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Text(String),
}

impl PreferenceValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PreferenceValue::Bool(b) => Some(*b),
            PreferenceValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PreferenceValue::Text(s) => Some(s),
            PreferenceValue::Bool(_) => None,
        }
    }
}

impl From<bool> for PreferenceValue {
    fn from(v: bool) -> Self {
        PreferenceValue::Bool(v)
    }
}

impl From<&str> for PreferenceValue {
    fn from(v: &str) -> Self {
        PreferenceValue::Text(v.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(v: String) -> Self {
        PreferenceValue::Text(v)
    }
}

/// How the host should persist an updated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Part of a bulk update of many documents.
    pub bulk: bool,
    /// Allow the host to delay and coalesce the write.
    pub debounce: bool,
}

impl UpdateOptions {
    /// One document, written immediately.
    pub const fn single() -> Self {
        Self {
            bulk: false,
            debounce: false,
        }
    }
}

// ── Collaborator traits ─────────────────────────────────────────────────────

/// Reports the documents currently selected in the host UI.
#[async_trait]
pub trait SelectionSource: Send + Sync {
    async fn selected_documents(&self) -> Result<Vec<Document>, HostError>;
}

/// Keyed preference lookup for this extension.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// `Ok(None)` when the key was never set.
    async fn get(&self, key: &str) -> Result<Option<PreferenceValue>, HostError>;
}

/// Maps a document's stored file reference to a readable local path.
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn resolve(&self, file_ref: &str) -> Result<PathBuf, HostError>;
}

/// Persists a mutated document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn update(&self, document: &Document, options: UpdateOptions) -> Result<(), HostError>;
}

/// The consumed host collaborators, bundled for the orchestrator.
#[derive(Clone)]
pub struct HostServices {
    pub selection: Arc<dyn SelectionSource>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub files: Arc<dyn FileResolver>,
    pub documents: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}

// ── Stock implementations ───────────────────────────────────────────────────

/// An in-memory preference map; missing keys fall back to defaults.
#[async_trait]
impl PreferenceStore for HashMap<String, PreferenceValue> {
    async fn get(&self, key: &str) -> Result<Option<PreferenceValue>, HostError> {
        Ok(HashMap::get(self, key).cloned())
    }
}

/// Resolves `file://` URLs and bare paths on the local file system.
///
/// The protocol prefix is erased; everything else is taken as a path. No
/// existence check is made here, the extractor reports unreadable files.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileResolver;

#[async_trait]
impl FileResolver for LocalFileResolver {
    async fn resolve(&self, file_ref: &str) -> Result<PathBuf, HostError> {
        let trimmed = file_ref.trim();
        if trimmed.is_empty() {
            return Err(HostError::new("empty file reference"));
        }
        Ok(PathBuf::from(erase_protocol(trimmed)))
    }
}

/// Strip a leading `scheme://` from a file reference.
pub fn erase_protocol(file_ref: &str) -> &str {
    match file_ref.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => file_ref,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erase_protocol_strips_scheme() {
        assert_eq!(erase_protocol("file:///home/a/paper.pdf"), "/home/a/paper.pdf");
        assert_eq!(erase_protocol("/home/a/paper.pdf"), "/home/a/paper.pdf");
        assert_eq!(erase_protocol("C:\\papers\\x.pdf"), "C:\\papers\\x.pdf");
    }

    #[tokio::test]
    async fn local_resolver_rejects_empty_reference() {
        assert!(LocalFileResolver.resolve("  ").await.is_err());
        let p = LocalFileResolver.resolve("file:///tmp/a.pdf").await.unwrap();
        assert_eq!(p, PathBuf::from("/tmp/a.pdf"));
    }

    #[tokio::test]
    async fn hashmap_preferences() {
        let mut prefs: HashMap<String, PreferenceValue> = HashMap::new();
        prefs.insert("markdown".into(), false.into());
        prefs.insert("pageNum".into(), "3".into());

        assert_eq!(
            PreferenceStore::get(&prefs, "markdown").await.unwrap(),
            Some(PreferenceValue::Bool(false))
        );
        let pages = PreferenceStore::get(&prefs, "pageNum").await.unwrap();
        assert_eq!(pages.as_ref().and_then(PreferenceValue::as_str), Some("3"));
        assert_eq!(PreferenceStore::get(&prefs, "ai-model").await.unwrap(), None);
    }

    #[test]
    fn preference_value_untagged_serde() {
        let v: PreferenceValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, PreferenceValue::Bool(true));
        let v: PreferenceValue = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(v.as_str(), Some("5"));
    }

    #[test]
    fn document_builder() {
        let d = Document::new("1", "T").with_file("/p.pdf").with_note("n");
        assert_eq!(d.file_ref.as_deref(), Some("/p.pdf"));
        assert_eq!(d.note, "n");
    }
}
