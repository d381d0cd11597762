//! Append a summary to a paper's note.
//!
//! Merging is append-only: the existing note always survives as a contiguous
//! substring of the result, in its original position. The only thing ever
//! placed in front of it is the structured marker, and only when the note
//! does not already start with one.

use crate::config::Style;

/// Leading token that makes the host render a note as markdown.
pub const STRUCTURED_MARKER: &str = "<md>";

/// Heading placed above each summary in a structured note.
pub const STRUCTURED_HEADING: &str = "## AI Summary ";

/// Label placed before each summary in a plain note.
pub const PLAIN_LABEL: &str = "AI Summary: ";

/// Inputs of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMergeInput<'a> {
    pub existing: &'a str,
    pub summary: &'a str,
    pub style: Style,
}

impl NoteMergeInput<'_> {
    pub fn merge(&self) -> MergeResult {
        merge_note(self.existing, self.summary, self.style)
    }
}

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResult {
    /// The note to persist.
    Updated(String),
    /// Nothing to add; the note must not be written.
    Unchanged,
}

impl MergeResult {
    /// The note after the merge.
    pub fn into_note(self, existing: &str) -> String {
        match self {
            MergeResult::Updated(note) => note,
            MergeResult::Unchanged => existing.to_string(),
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, MergeResult::Updated(_))
    }
}

/// Merge `summary` into `existing` in the given style.
///
/// An empty summary leaves the note untouched.
pub fn merge_note(existing: &str, summary: &str, style: Style) -> MergeResult {
    if summary.is_empty() {
        return MergeResult::Unchanged;
    }
    MergeResult::Updated(match style {
        Style::Structured => merge_structured(existing, summary),
        Style::Plain => merge_plain(existing, summary),
    })
}

/// Markdown merge: the result always starts with [`STRUCTURED_MARKER`].
pub fn merge_structured(existing: &str, summary: &str) -> String {
    if existing.is_empty() {
        format!("{STRUCTURED_MARKER}\n{STRUCTURED_HEADING}\n\n{summary}")
    } else if existing.starts_with(STRUCTURED_MARKER) {
        format!("{existing}\n\n{STRUCTURED_HEADING}\n\n{summary}")
    } else {
        format!("{STRUCTURED_MARKER}\n{existing}\n\n{STRUCTURED_HEADING}\n\n{summary}")
    }
}

/// Plain-text merge.
pub fn merge_plain(existing: &str, summary: &str) -> String {
    if existing.is_empty() {
        format!("{PLAIN_LABEL}{summary}")
    } else {
        format!("{existing}\n\n{PLAIN_LABEL}{summary}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: &str = "Transformers use self-attention.";

    #[test]
    fn structured_empty_note() {
        assert_eq!(
            merge_structured("", S),
            "<md>\n## AI Summary \n\nTransformers use self-attention."
        );
    }

    #[test]
    fn structured_marked_note_is_appended_to() {
        let existing = "<md>\n# My notes\n- point";
        let merged = merge_structured(existing, S);
        assert_eq!(merged, format!("{existing}\n\n## AI Summary \n\n{S}"));
    }

    #[test]
    fn structured_plain_note_gets_marker_once() {
        let merged = merge_structured("read later", S);
        assert_eq!(merged, format!("<md>\nread later\n\n## AI Summary \n\n{S}"));

        let again = merge_structured(&merged, "Second.");
        assert!(again.starts_with("<md>\n"));
        assert!(!again.starts_with("<md>\n<md>"));
        assert_eq!(again.matches(STRUCTURED_MARKER).count(), 1);
    }

    #[test]
    fn plain_merges() {
        assert_eq!(merge_plain("", S), format!("AI Summary: {S}"));
        assert_eq!(merge_plain("old", S), format!("old\n\nAI Summary: {S}"));
    }

    #[test]
    fn empty_summary_is_unchanged() {
        for style in [Style::Structured, Style::Plain] {
            assert_eq!(merge_note("keep me", "", style), MergeResult::Unchanged);
            assert_eq!(merge_note("keep me", "", style).into_note("keep me"), "keep me");
        }
    }

    #[test]
    fn result_ends_with_summary_and_contains_existing() {
        let notes = ["", "plain", "<md>\n## Old", "multi\nline\n\nnote", "<md>"];
        for style in [Style::Structured, Style::Plain] {
            for existing in notes {
                let merged = NoteMergeInput {
                    existing,
                    summary: S,
                    style,
                }
                .merge()
                .into_note(existing);
                assert!(merged.ends_with(S), "{style:?} {existing:?}");
                assert!(merged.contains(existing), "{style:?} {existing:?}");
                assert!(merged.len() > existing.len());
            }
        }
    }
}
