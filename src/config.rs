//! Configuration types for a summarization run.
//!
//! Every knob lives in [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`] or read from the host's preference store with
//! [`SummaryConfig::from_preferences`]. Validation happens once, before the
//! PDF is opened, so a bad page count fails fast instead of half-way through
//! a run.

use crate::error::SummaryError;
use crate::host::{PreferenceStore, PreferenceValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Default chat-completion endpoint (a local Ollama server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434/api/chat";

/// Default request timeout. Local models can take minutes on long prompts.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of pages fed to the model.
pub const DEFAULT_PAGE_LIMIT: usize = 5;

/// Preference keys read by [`SummaryConfig::from_preferences`].
pub mod keys {
    /// Boolean: merge the summary as markdown (structured) or plain text.
    pub const MARKDOWN: &str = "markdown";
    /// Option string: chat model identifier.
    pub const MODEL: &str = "ai-model";
    /// String holding a positive integer: pages to extract.
    pub const PAGE_COUNT: &str = "pageNum";
    /// Optional string: chat endpoint URL.
    pub const API_URL: &str = "api-url";
}

/// Configuration for one summarization run.
///
/// # Example
/// ```rust
/// use paper_summarizer::{PageLimit, Style, SummaryConfig};
///
/// let config = SummaryConfig::builder()
///     .model("llama3.1")
///     .page_limit(PageLimit::new(3).unwrap())
///     .style(Style::Plain)
///     .build()
///     .unwrap();
/// assert_eq!(config.page_limit.get(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    /// Chat model identifier. Default: `llama3.1`.
    pub model: String,

    /// Chat-completion endpoint. Default: `http://127.0.0.1:11434/api/chat`.
    pub endpoint: String,

    /// Per-request timeout. Default: 300 s.
    pub timeout: Duration,

    /// Pages scanned for text. Default: 5.
    pub page_limit: PageLimit,

    /// How the summary is merged into the note. Default: structured.
    pub style: Style,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_limit: PageLimit::default(),
            style: Style::default(),
        }
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from the host's preference store.
    ///
    /// Missing keys take their defaults. Present but unusable values are a
    /// configuration error, never silently replaced.
    pub async fn from_preferences(store: &dyn PreferenceStore) -> Result<Self, SummaryError> {
        let mut builder = Self::builder();

        if let Some(v) = read(store, keys::MARKDOWN).await? {
            builder = builder.style(Style::from_markdown_flag(parse_bool(keys::MARKDOWN, &v)?));
        }

        if let Some(v) = read(store, keys::MODEL).await? {
            let model = expect_text(keys::MODEL, &v)?;
            if !model.trim().is_empty() {
                builder = builder.model(model.trim());
            }
        }

        if let Some(v) = read(store, keys::PAGE_COUNT).await? {
            builder = builder.page_limit(expect_text(keys::PAGE_COUNT, &v)?.parse()?);
        }

        if let Some(v) = read(store, keys::API_URL).await? {
            let url = expect_text(keys::API_URL, &v)?;
            if !url.trim().is_empty() {
                builder = builder.endpoint(url.trim());
            }
        }

        builder.build()
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn page_limit(mut self, limit: PageLimit) -> Self {
        self.config.page_limit = limit;
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.config.style = style;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummaryError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(SummaryError::InvalidConfig("Model must not be empty".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(SummaryError::InvalidConfig(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.timeout.is_zero() {
            return Err(SummaryError::InvalidConfig("Timeout must be > 0".into()));
        }
        Ok(self.config)
    }
}

// ── Page limit ───────────────────────────────────────────────────────────

/// Maximum number of PDF pages scanned for text; always ≥ 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageLimit(NonZeroUsize);

impl PageLimit {
    /// `None` for zero.
    pub fn new(pages: usize) -> Option<Self> {
        NonZeroUsize::new(pages).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_PAGE_LIMIT - 1))
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageLimit {
    type Err = SummaryError;

    /// Parse the host's page-count string. Non-numeric, zero and negative
    /// values are rejected rather than clamped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let n: i64 = trimmed.parse().map_err(|_| {
            SummaryError::InvalidConfig(format!("Page count must be a whole number, got '{s}'"))
        })?;
        if n <= 0 {
            return Err(SummaryError::InvalidConfig(format!(
                "Page count must be ≥ 1, got {n}"
            )));
        }
        usize::try_from(n)
            .ok()
            .and_then(PageLimit::new)
            .ok_or_else(|| SummaryError::InvalidConfig(format!("Page count {n} is out of range")))
    }
}

// ── Style ────────────────────────────────────────────────────────────────

/// How the summary is merged into the existing note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Markdown note: `<md>` marker plus a `## AI Summary` section. (default)
    #[default]
    Structured,
    /// Plain text note: `AI Summary: …` paragraph.
    Plain,
}

impl Style {
    /// Map the host's boolean "markdown" preference.
    pub fn from_markdown_flag(markdown: bool) -> Self {
        if markdown {
            Style::Structured
        } else {
            Style::Plain
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn read(
    store: &dyn PreferenceStore,
    key: &str,
) -> Result<Option<PreferenceValue>, SummaryError> {
    store
        .get(key)
        .await
        .map_err(|e| SummaryError::Host(format!("Failed to read preference '{key}': {e}")))
}

fn expect_text<'a>(key: &str, v: &'a PreferenceValue) -> Result<&'a str, SummaryError> {
    v.as_str().ok_or_else(|| {
        SummaryError::InvalidConfig(format!("Preference '{key}' must be a string, got {v:?}"))
    })
}

fn parse_bool(key: &str, v: &PreferenceValue) -> Result<bool, SummaryError> {
    match v {
        PreferenceValue::Bool(b) => Ok(*b),
        PreferenceValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(SummaryError::InvalidConfig(format!(
                "Preference '{key}' must be a boolean, got '{s}'"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn prefs(pairs: &[(&str, PreferenceValue)]) -> HashMap<String, PreferenceValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn defaults() {
        let c = SummaryConfig::default();
        assert_eq!(c.model, "llama3.1");
        assert_eq!(c.endpoint, "http://127.0.0.1:11434/api/chat");
        assert_eq!(c.timeout, Duration::from_secs(300));
        assert_eq!(c.page_limit.get(), 5);
        assert_eq!(c.style, Style::Structured);
    }

    #[test]
    fn page_limit_parse() {
        assert_eq!("5".parse::<PageLimit>().unwrap().get(), 5);
        assert_eq!(" 12 ".parse::<PageLimit>().unwrap().get(), 12);
        for bad in ["0", "-3", "abc", "", "2.5"] {
            assert!(
                matches!(bad.parse::<PageLimit>(), Err(SummaryError::InvalidConfig(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(SummaryConfig::builder().model("  ").build().is_err());
        assert!(SummaryConfig::builder().endpoint("localhost:11434").build().is_err());
        assert!(SummaryConfig::builder().timeout(Duration::ZERO).build().is_err());
    }

    #[tokio::test]
    async fn from_empty_preferences_gives_defaults() {
        let store = prefs(&[]);
        let c = SummaryConfig::from_preferences(&store).await.unwrap();
        assert_eq!(c, SummaryConfig::default());
    }

    #[tokio::test]
    async fn from_preferences_reads_every_key() {
        let store = prefs(&[
            (keys::MARKDOWN, false.into()),
            (keys::MODEL, "era".into()),
            (keys::PAGE_COUNT, "2".into()),
            (keys::API_URL, "http://10.0.0.2:11434/api/chat".into()),
        ]);
        let c = SummaryConfig::from_preferences(&store).await.unwrap();
        assert_eq!(c.style, Style::Plain);
        assert_eq!(c.model, "era");
        assert_eq!(c.page_limit.get(), 2);
        assert_eq!(c.endpoint, "http://10.0.0.2:11434/api/chat");
    }

    #[tokio::test]
    async fn invalid_page_count_is_config_error() {
        let store = prefs(&[(keys::PAGE_COUNT, "zero".into())]);
        let err = SummaryConfig::from_preferences(&store).await.unwrap_err();
        assert!(matches!(err, SummaryError::InvalidConfig(_)), "got: {err}");
    }

    #[tokio::test]
    async fn markdown_flag_accepts_string_booleans() {
        let store = prefs(&[(keys::MARKDOWN, "false".into())]);
        let c = SummaryConfig::from_preferences(&store).await.unwrap();
        assert_eq!(c.style, Style::Plain);

        let store = prefs(&[(keys::MARKDOWN, "sometimes".into())]);
        assert!(SummaryConfig::from_preferences(&store).await.is_err());
    }
}
