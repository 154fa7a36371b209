use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::normalizer::ResponseNormalizer;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    // Matches ```json ... ``` or ``` ... ``` blocks
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
    })
}

/// Normalizer that digs the JSON payload out of chatty model output
///
/// Strips Markdown code fences. Inside a fence, the first `{...}` or `[...]`
/// span that parses is taken. Outside a fence, only a reply that opens as
/// JSON may lose trailing chatter; prose that merely mentions JSON is left
/// alone so the caller's parse fails and keeps the text.
pub struct JsonPayloadNormalizer;

impl Default for JsonPayloadNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonPayloadNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn fenced(text: &str) -> Option<&str> {
        fence_regex()
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|inner| inner.as_str().trim())
    }

    fn span_from(text: &str, start: usize, open: char) -> Option<&str> {
        let close = if open == '{' { '}' } else { ']' };
        let end = text.rfind(close)?;
        if end <= start {
            return None;
        }
        let span = &text[start..=end];
        serde_json::from_str::<serde_json::Value>(span)
            .is_ok()
            .then_some(span)
    }

    fn embedded_span(text: &str) -> Option<&str> {
        text.char_indices()
            .filter(|(_, c)| *c == '{' || *c == '[')
            .find_map(|(start, open)| Self::span_from(text, start, open))
    }

    fn leading_span(text: &str) -> Option<&str> {
        match text.chars().next() {
            Some(open @ ('{' | '[')) => Self::span_from(text, 0, open),
            _ => None,
        }
    }
}

impl ResponseNormalizer for JsonPayloadNormalizer {
    fn normalize(&self, raw_output: &str) -> String {
        let trimmed = raw_output.trim();
        let (text, fenced) = match Self::fenced(trimmed) {
            Some(inner) => (inner, true),
            None => (trimmed, false),
        };

        if serde_json::from_str::<serde_json::Value>(text).is_ok() {
            return text.to_string();
        }

        let span = if fenced {
            Self::embedded_span(text)
        } else {
            Self::leading_span(text)
        };

        match span {
            Some(span) => {
                debug!(
                    "{}: kept {} char JSON payload from {} char response",
                    self.name(),
                    span.len(),
                    raw_output.len()
                );
                span.to_string()
            }
            None => text.to_string(),
        }
    }

    fn name(&self) -> &'static str {
        "JsonPayloadNormalizer"
    }
}
