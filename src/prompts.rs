//! Prompt text for the summarization call.
//!
//! Every prompt lives here so a wording change touches exactly one place and
//! tests can inspect the exact strings sent to the model.

use crate::config::Style;

/// System instruction shared by both styles.
pub const BASE_SYSTEM_INSTRUCTION: &str = "You are an AI assistant for summarizing academic publications. You answer with a perfect summary of the given text. You do not add unnecessary filler, you just answer with the summary.\n";

/// Appended to the system instruction for [`Style::Structured`].
pub const MARKDOWN_SUFFIX: &str =
    "Don't start with a title etc. Please format the output in markdown style.\n";

/// User-prompt preamble; the paper title follows it.
pub const SUMMARY_REQUEST: &str = "Please summarize the following paper by focusing on the key findings and main arguments. Limit the summary to 150 words and present it in a clear, concise format. Do not include introductory phrases like 'The summary is...' or any unnecessary filler. Title: ";

/// The two fixed parts of a summarization prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Sent as the `system` message.
    pub system_instruction: String,
    /// Start of the `user` message, ending with the paper title.
    pub prompt_prefix: String,
}

impl Prompt {
    /// The full user message: prefix, then the extracted text after a blank
    /// line. Empty text adds nothing.
    pub fn user_content(&self, extracted: &str) -> String {
        if extracted.is_empty() {
            return self.prompt_prefix.clone();
        }
        let mut out = String::with_capacity(self.prompt_prefix.len() + 2 + extracted.len());
        out.push_str(&self.prompt_prefix);
        out.push_str("\n\n");
        out.push_str(extracted);
        out
    }
}

/// Build the prompt for one paper. Pure and deterministic.
pub fn build_prompt(title: &str, style: Style) -> Prompt {
    let system_instruction = match style {
        Style::Structured => format!("{BASE_SYSTEM_INSTRUCTION}{MARKDOWN_SUFFIX}"),
        Style::Plain => BASE_SYSTEM_INSTRUCTION.to_string(),
    };
    Prompt {
        system_instruction,
        prompt_prefix: format!("{SUMMARY_REQUEST}{title}"),
    }
}
