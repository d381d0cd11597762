//! What the summarizer registers with its host, and how host events reach it.
//!
//! The host learns about the extension from an [`ExtensionManifest`]: its
//! preferences with their defaults, one external command and one context-menu
//! item. Both entry points lead to the same run; see [`Extension::handle`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{keys, DEFAULT_MODEL, DEFAULT_PAGE_LIMIT};
use crate::host::PreferenceValue;
use crate::summarize::{RunOutcome, Summarizer};

/// Identifier the host files preferences and menu items under.
///
/// Matches the id existing installations already store preferences and
/// route context-menu clicks with.
pub const EXTENSION_ID: &str = "ollama-summarizer-paperlib-extension";

/// Event fired by the host command palette.
pub const COMMAND_EVENT: &str = "summarize_selected_paper";

/// Externally visible command id.
pub const COMMAND_ID: &str = "summarize";

/// Context-menu item id.
pub const CONTEXT_MENU_ITEM: &str = "summarize";

/// One preference shown in the host's settings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSpec {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: PreferenceKind,
    /// Display position.
    pub order: u32,
}

/// Preference type together with its default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreferenceKind {
    Boolean {
        value: bool,
    },
    /// `options` maps stored value → display label.
    Options {
        options: BTreeMap<String, String>,
        value: String,
    },
    String {
        value: String,
    },
}

impl PreferenceKind {
    pub fn default_value(&self) -> PreferenceValue {
        match self {
            PreferenceKind::Boolean { value } => PreferenceValue::Bool(*value),
            PreferenceKind::Options { value, .. } | PreferenceKind::String { value } => {
                PreferenceValue::Text(value.clone())
            }
        }
    }
}

/// A command the host exposes to users and other extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub id: String,
    pub description: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuItem {
    pub id: String,
    pub label: String,
}

/// Registration payload for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    pub id: String,
    /// Keyed by preference key; ordered for stable output.
    pub default_preference: BTreeMap<String, PreferenceSpec>,
    pub commands: Vec<CommandSpec>,
    pub context_menu: Vec<ContextMenuItem>,
}

impl ExtensionManifest {
    /// Preference defaults as the host would store them.
    pub fn default_preferences(&self) -> HashMap<String, PreferenceValue> {
        self.default_preference
            .iter()
            .map(|(key, spec)| (key.clone(), spec.kind.default_value()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for ExtensionManifest {
    fn default() -> Self {
        let mut prefs = BTreeMap::new();
        prefs.insert(
            keys::MARKDOWN.to_string(),
            PreferenceSpec {
                name: "Markdown Style".into(),
                description: "Use markdown style for the summary note.".into(),
                kind: PreferenceKind::Boolean { value: true },
                order: 0,
            },
        );
        prefs.insert(
            keys::MODEL.to_string(),
            PreferenceSpec {
                name: "LLM model".into(),
                description: "Ollama model to use".into(),
                kind: PreferenceKind::Options {
                    options: BTreeMap::from([
                        ("llama3.1".to_string(), "Llama 3.1".to_string()),
                        ("era".to_string(), "EtherealR".to_string()),
                    ]),
                    value: DEFAULT_MODEL.into(),
                },
                order: 1,
            },
        );
        prefs.insert(
            keys::PAGE_COUNT.to_string(),
            PreferenceSpec {
                name: "Page Number".into(),
                description: "The number of pages to provide.".into(),
                kind: PreferenceKind::String {
                    value: DEFAULT_PAGE_LIMIT.to_string(),
                },
                order: 2,
            },
        );

        Self {
            id: EXTENSION_ID.into(),
            default_preference: prefs,
            commands: vec![CommandSpec {
                id: COMMAND_ID.into(),
                description: "Summarize the current selected paper with ollama.".into(),
                event: COMMAND_EVENT.into(),
            }],
            context_menu: vec![ContextMenuItem {
                id: CONTEXT_MENU_ITEM.into(),
                label: "Ollama Summary - summarize".into(),
            }],
        }
    }
}

/// A host event that may concern this extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// A command event fired by name.
    Command { event: String },
    /// A click on an extension-provided context-menu item.
    ContextMenu { ext_id: String, item_id: String },
}

/// The registered extension: manifest plus the pipeline it drives.
#[derive(Debug, Clone)]
pub struct Extension {
    manifest: ExtensionManifest,
    summarizer: Summarizer,
}

impl Extension {
    pub fn new(summarizer: Summarizer) -> Self {
        Self::with_manifest(ExtensionManifest::default(), summarizer)
    }

    pub fn with_manifest(manifest: ExtensionManifest, summarizer: Summarizer) -> Self {
        Self {
            manifest,
            summarizer,
        }
    }

    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    /// `true` when `trigger` should start a run.
    pub fn accepts(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::Command { event } => self.manifest.commands.iter().any(|c| &c.event == event),
            Trigger::ContextMenu { ext_id, item_id } => {
                ext_id == &self.manifest.id
                    && self.manifest.context_menu.iter().any(|i| &i.id == item_id)
            }
        }
    }

    /// Run the pipeline for a trigger aimed at this extension.
    ///
    /// Returns `None` for events that belong to someone else.
    pub async fn handle(&self, trigger: Trigger) -> Option<RunOutcome> {
        if !self.accepts(&trigger) {
            debug!(?trigger, "Ignoring trigger for another extension");
            return None;
        }
        Some(self.summarizer.summarize_selected().await)
    }
}
