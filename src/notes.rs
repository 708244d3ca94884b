//! Note composition
//!
//! Turns a selection of issue keys into the free-text notes attached to a
//! timer. Pure functions; the gateway and reconciler decide when to call them.

use crate::jira::Issue;

/// How composed labels are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    /// Comma-separated, for a one-shot selection ("AB-1: ..., AB-2: ...").
    Selection,
    /// Newline-separated, for text appended to existing notes.
    Append,
}

impl JoinStyle {
    fn separator(self) -> &'static str {
        match self {
            JoinStyle::Selection => ", ",
            JoinStyle::Append => "\n",
        }
    }
}

/// Compose note text from selected issue keys.
///
/// Keys are resolved in selection order; duplicates keep their first
/// occurrence and keys with no matching issue are dropped silently. Labels
/// are trimmed before joining, so the result is never whitespace-only. An
/// empty result means "no notes", not an error.
pub fn compose(selection: &[String], issues: &[Issue], style: JoinStyle) -> String {
    let mut seen = Vec::new();
    let mut labels = Vec::new();

    for key in selection {
        if seen.contains(&key.as_str()) {
            continue;
        }
        seen.push(key.as_str());

        if let Some(issue) = issues.iter().find(|i| i.key == *key) {
            let label = issue.label.trim();
            if !label.is_empty() {
                labels.push(label);
            }
        }
    }

    labels.join(style.separator())
}

/// Append new note text to a timer's existing notes.
pub fn combine(existing: &str, new: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{}\n{}", existing, new)
    }
}
