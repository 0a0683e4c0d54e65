//! `/poll "Question?" "Option 1" "Option 2"` parsing.

use std::sync::OnceLock;

use regex::Regex;

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
}

fn quoted_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#""([^"]+)""#).ok())
        .as_ref()
}

/// Question plus 2..=4 options from the quoted parts of `text`.
/// Extra options are dropped with a warning; fewer than two yields `None`.
pub fn parse_poll_command(text: &str) -> Option<PollRequest> {
    let mut parts: Vec<String> = quoted_pattern()?
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    if parts.len() < 1 + MIN_POLL_OPTIONS {
        tracing::debug!("⚠️ Poll needs a question and at least {} options", MIN_POLL_OPTIONS);
        return None;
    }

    let question = parts.remove(0);
    if parts.len() > MAX_POLL_OPTIONS {
        tracing::warn!(
            "⚠️ Poll can have at most {} options. Truncating to {}.",
            MAX_POLL_OPTIONS,
            MAX_POLL_OPTIONS
        );
        parts.truncate(MAX_POLL_OPTIONS);
    }

    Some(PollRequest {
        question,
        options: parts,
    })
}
