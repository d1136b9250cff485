//! Structured extraction from raw model replies
//!
//! The model is asked for bare JSON but regularly wraps it in a fenced block,
//! surrounds it with prose, or breaks it. Extraction runs an ordered list of
//! strategies and stops at the first one that yields a JSON object.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::preview;

/// JSON object produced by a successful extraction
pub type StructuredMap = Map<String, Value>;

/// Extraction strategies, in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Fenced block labelled `json`
    JsonFence,
    /// Any fenced block
    AnyFence,
    /// First balanced `{...}` span
    BraceSpan,
    /// The whole reply
    WholeText,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 4] = [
        ExtractionStrategy::JsonFence,
        ExtractionStrategy::AnyFence,
        ExtractionStrategy::BraceSpan,
        ExtractionStrategy::WholeText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExtractionStrategy::JsonFence => "json_fence",
            ExtractionStrategy::AnyFence => "any_fence",
            ExtractionStrategy::BraceSpan => "brace_span",
            ExtractionStrategy::WholeText => "whole_text",
        }
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Successful extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub map: StructuredMap,
    pub strategy: ExtractionStrategy,
}

/// Runs the extraction strategies against a reply
#[derive(Debug, Clone)]
pub struct Extractor {
    json_fence: Regex,
    any_fence: Regex,
    log_preview_chars: usize,
}

impl Extractor {
    pub fn new(log_preview_chars: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            json_fence: Regex::new(r"(?is)```[ \t]*json\b[^\n]*\n?(.*?)```")?,
            any_fence: Regex::new(r"(?s)```[A-Za-z0-9_+.-]*[ \t]*\r?\n?(.*?)```")?,
            log_preview_chars,
        })
    }

    /// Try every strategy in order and return the first JSON object found
    ///
    /// Parse failures are logged and never returned; `None` means every
    /// strategy failed.
    pub fn extract_structured(&self, text: &str) -> Option<Extraction> {
        for strategy in ExtractionStrategy::ORDER {
            let Some(candidate) = self.candidate(strategy, text) else {
                continue;
            };

            match parse_object(candidate) {
                Ok(map) => {
                    tracing::debug!(strategy = %strategy, keys = map.len(), "Extracted structured reply");
                    return Some(Extraction { map, strategy });
                }
                Err(error) => {
                    tracing::warn!(
                        strategy = %strategy,
                        error = %error,
                        raw_text = %preview(text, self.log_preview_chars),
                        "JSON extraction strategy failed"
                    );
                }
            }
        }

        None
    }

    /// Text a strategy would parse, if the reply contains one
    fn candidate<'a>(&self, strategy: ExtractionStrategy, text: &'a str) -> Option<&'a str> {
        match strategy {
            ExtractionStrategy::JsonFence => fenced_body(&self.json_fence, text),
            ExtractionStrategy::AnyFence => fenced_body(&self.any_fence, text),
            ExtractionStrategy::BraceSpan => first_brace_span(text),
            ExtractionStrategy::WholeText => Some(text.trim()),
        }
    }
}

fn fenced_body<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|body| body.as_str().trim())
}

/// Parse text into a JSON object
///
/// Valid JSON that is not an object is rejected.
pub fn parse_object(candidate: &str) -> Result<StructuredMap, String> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Locate the first balanced `{...}` span
///
/// Braces inside string literals are ignored. Returns `None` when the first
/// opening brace is never closed.
pub fn first_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(1000).unwrap()
    }

    #[test]
    fn test_json_fence() {
        let text = "Here you go:\n```json\n{\"country\": \"France\"}\n```\nThanks";
        let extraction = extractor().extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::JsonFence);
        assert_eq!(extraction.map["country"], "France");
    }

    #[test]
    fn test_json_fence_label_is_case_insensitive() {
        let text = "```JSON\n{\"country\": \"Spain\"}\n```";
        let extraction = extractor().extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::JsonFence);
    }

    #[test]
    fn test_unlabelled_fence() {
        let text = "```\n{\"country\": \"Italy\"}\n```";
        let extraction = extractor().extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::AnyFence);
        assert_eq!(extraction.map["country"], "Italy");
    }

    #[test]
    fn test_other_language_fence_strips_info_string() {
        let text = "```javascript\n{\"country\": \"Japan\"}\n```";
        let extraction = extractor().extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::AnyFence);
        assert_eq!(extraction.map["country"], "Japan");
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let text = "The coin is described below. {\"country\": \"Canada\", \"note\": \"a } inside\"} Hope this helps.";
        let extraction = extractor().extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::BraceSpan);
        assert_eq!(extraction.map["country"], "Canada");
    }

    #[test]
    fn test_bare_json_is_found_by_brace_span() {
        let text = "  {\"country\": \"Germany\"}  ";
        let extraction = extractor().extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::BraceSpan);
    }

    #[test]
    fn test_malformed_json_fails_every_strategy() {
        let text = "```json\n{\"country\": \"France\", }\n```";
        assert!(extractor().extract_structured(text).is_none());
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert!(extractor().extract_structured("[1, 2, 3]").is_none());
        assert!(extractor().extract_structured("\"just a string\"").is_none());
    }

    #[test]
    fn test_prose_without_json() {
        assert!(extractor()
            .extract_structured("This is a 1964 Kennedy Half Dollar made of silver")
            .is_none());
    }

    #[test]
    fn test_first_brace_span_nested() {
        let text = "x {\"a\": {\"b\": 1}} y {\"c\": 2}";
        assert_eq!(first_brace_span(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_first_brace_span_escaped_quote() {
        let text = r#"{"a": "say \"}\" now"}"#;
        assert_eq!(first_brace_span(text), Some(text));
    }

    #[test]
    fn test_first_brace_span_unbalanced() {
        assert_eq!(first_brace_span("{\"a\": {\"b\": 1}"), None);
        assert_eq!(first_brace_span("no braces"), None);
    }

    #[test]
    fn test_parse_object_reports_kind() {
        let err = parse_object("42").unwrap_err();
        assert!(err.contains("a number"));
    }
}
