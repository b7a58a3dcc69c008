use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

/// Marker placed in the fallback object when no strategy produced JSON.
pub const PARSE_FAILURE_MARKER: &str = "Could not parse JSON response";

/// How much of an unparseable reply is kept for diagnostics.
const RAW_PREVIEW_CHARS: usize = 500;

static LABELED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("labeled fence pattern"));
static BARE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*(\{.*?\})\s*```").expect("bare fence pattern"));

/// Outcome of interpreting a model reply. When `is_fallback` is true,
/// `value` is the guaranteed diagnostic object, never the model's answer.
#[derive(Debug)]
pub struct Interpreted {
    pub value: Value,
    pub is_fallback: bool,
}

type Extractor = fn(&str) -> Option<String>;

/// Candidate-extraction strategies, most specific first. Each returns a
/// substring that might be JSON; the caller tries to parse each in turn.
/// New heuristics append here without touching any call site.
const EXTRACTORS: &[Extractor] = &[labeled_fence_block, bare_fence_block, brace_span];

fn labeled_fence_block(text: &str) -> Option<String> {
    LABELED_FENCE.captures(text).map(|c| c[1].to_string())
}

fn bare_fence_block(text: &str) -> Option<String> {
    BARE_FENCE.captures(text).map(|c| c[1].to_string())
}

fn brace_span(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| text[start..=end].to_string())
}

/// Recover a structured value from a model reply. Generative models do not
/// reliably honor "respond with only JSON", so the whole-text parse is
/// followed by progressively looser extraction, and total failure yields a
/// well-formed fallback object instead of an error.
pub fn interpret(raw: &str) -> Interpreted {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Interpreted {
            value,
            is_fallback: false,
        };
    }

    for extract in EXTRACTORS {
        if let Some(candidate) = extract(raw) {
            if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                return Interpreted {
                    value,
                    is_fallback: false,
                };
            }
        }
    }

    Interpreted {
        value: json!({
            "error": PARSE_FAILURE_MARKER,
            "raw_response": preview(raw),
            "fallback": true,
        }),
        is_fallback: true,
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(RAW_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_directly() {
        let out = interpret(r#"{"a": 1}"#);
        assert!(!out.is_fallback);
        assert_eq!(out.value, json!({"a": 1}));
    }

    #[test]
    fn parses_json_inside_labeled_fence() {
        let out = interpret("```json\n{\"a\": 1}\n```");
        assert!(!out.is_fallback);
        assert_eq!(out.value, json!({"a": 1}));
    }

    #[test]
    fn parses_json_inside_bare_fence() {
        let out = interpret("Here you go:\n```\n{\"total\": 3}\n```\nDone.");
        assert!(!out.is_fallback);
        assert_eq!(out.value, json!({"total": 3}));
    }

    #[test]
    fn parses_brace_span_surrounded_by_prose() {
        let out = interpret("Sure! The analysis is {\"summary\": \"ok\"} and nothing else.");
        assert!(!out.is_fallback);
        assert_eq!(out.value, json!({"summary": "ok"}));
    }

    #[test]
    fn falls_through_to_later_strategy_when_fence_content_is_broken() {
        // Labeled fence holds invalid JSON; the bare fence further down parses.
        let text = "```json\n{oops}\n```\nretrying\n```\n{\"ok\": true}\n```";
        let out = interpret(text);
        assert!(!out.is_fallback);
        assert_eq!(out.value, json!({"ok": true}));
    }

    #[test]
    fn unparseable_text_yields_fallback_and_never_errors() {
        let out = interpret("no json here");
        assert!(out.is_fallback);
        assert_eq!(out.value["error"], PARSE_FAILURE_MARKER);
        assert_eq!(out.value["fallback"], json!(true));
        assert_eq!(out.value["raw_response"], json!("no json here"));
    }

    #[test]
    fn fallback_preview_is_capped_at_500_chars() {
        let long = "x".repeat(800);
        let out = interpret(&long);
        assert!(out.is_fallback);
        let preview = out.value["raw_response"].as_str().unwrap();
        assert_eq!(preview.chars().count(), 500);
    }

    #[test]
    fn fallback_preview_respects_char_boundaries() {
        // 600 multi-byte chars; byte-indexed truncation would panic or split.
        let long = "é".repeat(600);
        let out = interpret(&long);
        assert!(out.is_fallback);
        let preview = out.value["raw_response"].as_str().unwrap();
        assert_eq!(preview.chars().count(), 500);
    }

    #[test]
    fn empty_input_yields_fallback() {
        let out = interpret("");
        assert!(out.is_fallback);
    }
}
