//! Output Repair Chain
//!
//! The model is asked to emit exactly one JSON value but may wrap it in prose
//! or markdown fences, use smart quotes, leave trailing commas, or truncate
//! under the token cap. The chain applies fixups in a fixed priority order,
//! attempting a parse after each step and stopping at the first success.
//!
//! Every fixup that changed the text is recorded by name, even when a later
//! fixup enabled the parse — operators can see which repair classes fire most
//! often and address root causes (raise the token cap, shorten the prompt).

use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::repair::MAX_PREVIEW_CHARS;

// =============================================================================
// Repair Steps
// =============================================================================

/// One named fixup in the chain, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStep {
    /// Strip a leading/trailing markdown code fence
    StripCodeFence,
    /// Extract the longest balanced brace/bracket region
    ExtractJsonRegion,
    /// Normalize typographic quotes to standard double quotes
    NormalizeQuotes,
    /// Remove trailing commas before `}`/`]`
    StripTrailingCommas,
    /// Close unterminated strings/brackets after truncation
    CloseTruncated,
}

impl RepairStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StripCodeFence => "strip_code_fence",
            Self::ExtractJsonRegion => "extract_json_region",
            Self::NormalizeQuotes => "normalize_quotes",
            Self::StripTrailingCommas => "strip_trailing_commas",
            Self::CloseTruncated => "close_truncated",
        }
    }
}

impl std::fmt::Display for RepairStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful parse, with the audit trail of fixups that were applied
#[derive(Debug, Clone)]
pub struct Repaired {
    pub value: Value,
    /// False only when the raw text parsed directly
    pub repaired: bool,
    /// Ordered names of every fixup that changed the text
    pub repairs: Vec<RepairStep>,
}

/// Chain exhausted without a parse
#[derive(Debug, Clone)]
pub struct RepairFailure {
    pub message: String,
    /// Bounded prefix of the offending text for diagnostics
    pub preview: String,
    /// Fixups that were attempted and changed the text
    pub repairs: Vec<RepairStep>,
}

impl std::fmt::Display for RepairFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (preview: {}...)", self.message, self.preview)
    }
}

impl std::error::Error for RepairFailure {}

// =============================================================================
// Repair Chain
// =============================================================================

/// Parse raw model output as one JSON value, repairing if necessary.
///
/// Idempotent on already-valid JSON: returns `repaired = false` with an
/// empty audit list.
pub fn repair_and_parse(raw: &str) -> Result<Repaired, RepairFailure> {
    let mut text = raw.trim().trim_start_matches('\u{feff}').to_string();

    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        return Ok(Repaired {
            value,
            repaired: false,
            repairs: Vec::new(),
        });
    }

    debug!("Direct JSON parse failed, entering repair chain");

    const CHAIN: [RepairStep; 5] = [
        RepairStep::StripCodeFence,
        RepairStep::ExtractJsonRegion,
        RepairStep::NormalizeQuotes,
        RepairStep::StripTrailingCommas,
        RepairStep::CloseTruncated,
    ];

    let mut repairs = Vec::new();

    for step in CHAIN {
        let fixed = apply(step, &text);
        if fixed != text {
            repairs.push(step);
            text = fixed;
        }

        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            warn!(steps = ?repairs, "Model output repaired");
            return Ok(Repaired {
                value,
                repaired: true,
                repairs,
            });
        }
    }

    Err(RepairFailure {
        message: "repair chain exhausted without a valid parse".to_string(),
        preview: raw.chars().take(MAX_PREVIEW_CHARS).collect(),
        repairs,
    })
}

fn apply(step: RepairStep, text: &str) -> String {
    match step {
        RepairStep::StripCodeFence => strip_code_fence(text),
        RepairStep::ExtractJsonRegion => extract_json_region(text),
        RepairStep::NormalizeQuotes => normalize_quotes(text),
        RepairStep::StripTrailingCommas => strip_trailing_commas(text),
        RepairStep::CloseTruncated => close_truncated(text),
    }
}

// =============================================================================
// Fixups
// =============================================================================

/// Strip ```json ... ``` or ``` ... ``` wrapping
fn strip_code_fence(text: &str) -> String {
    let mut result = text.trim().to_string();

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = result[first_newline + 1..].to_string();
    }

    if result.trim_end().ends_with("```") {
        let trimmed = result.trim_end();
        result = trimmed[..trimmed.len() - 3].trim_end().to_string();
    }

    result.trim().to_string()
}

/// Extract the longest balanced `{}`/`[]` region as the candidate JSON.
///
/// Scans from the first opener to its matching closer, tracking string and
/// escape state. Prose before/after the region is discarded.
fn extract_json_region(text: &str) -> String {
    let Some(start) = text.find(['{', '[']) else {
        return text.to_string();
    };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    let mut end = None;

    for (i, ch) in text[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + i + ch.len_utf8());
                    // Keep scanning: a later balanced close extends the region
                }
            }
            _ => {}
        }
    }

    match end {
        Some(end) => text[start..end].to_string(),
        None => text.to_string(),
    }
}

/// Normalize typographic quote characters to standard double quotes
fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' => '"',
            other => other,
        })
        .collect()
}

/// Remove trailing commas before `]` or `}`, outside string literals only.
/// Generated file contents legitimately contain `[1, ]`-style patterns.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut in_string = false;
    let mut escape = false;

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];

        if escape {
            escape = false;
            result.push(ch);
            i += 1;
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                // Look ahead, skipping whitespace
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }

                if j < chars.len() && (chars[j] == ']' || chars[j] == '}') {
                    i += 1;
                    continue;
                }
            }
            _ => {}
        }

        result.push(ch);
        i += 1;
    }

    result
}

/// Close an unterminated string and add missing closers, for output cut off
/// at the token cap
fn close_truncated(text: &str) -> String {
    let mut result = text.trim_end().to_string();

    // A trailing comma or colon left by truncation can never parse
    while result.ends_with(',') || result.ends_with(':') {
        result.pop();
        result = result.trim_end().to_string();
    }

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in result.chars() {
        if escape {
            escape = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    if in_string {
        result.push('"');
    }

    while let Some(closer) = stack.pop() {
        result.push(closer);
    }

    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_untouched() {
        let original = json!({"files": [{"path": "a.ts"}], "n": 3});
        let raw = serde_json::to_string(&original).unwrap();
        let result = repair_and_parse(&raw).unwrap();
        assert!(!result.repaired);
        assert!(result.repairs.is_empty());
        assert_eq!(result.value, original);
    }

    #[test]
    fn test_strip_code_fence() {
        let result = repair_and_parse("```json\n{\"key\": \"value\"}\n```").unwrap();
        assert!(result.repaired);
        assert_eq!(result.repairs, vec![RepairStep::StripCodeFence]);
        assert_eq!(result.value["key"], "value");
    }

    #[test]
    fn test_fence_and_trailing_comma_both_recorded() {
        let raw = "```json\n{\"files\": [{\"path\": \"a.ts\"},]}\n```";
        let result = repair_and_parse(raw).unwrap();
        assert!(result.repaired);
        assert!(result.repairs.contains(&RepairStep::StripCodeFence));
        assert!(result.repairs.contains(&RepairStep::StripTrailingCommas));
        assert!(result.value["files"].is_array());
    }

    #[test]
    fn test_extract_from_prose() {
        let raw = "Here is the plan:\n{\"pages\": [\"Home\"]}\nLet me know!";
        let result = repair_and_parse(raw).unwrap();
        assert!(result.repaired);
        assert!(result.repairs.contains(&RepairStep::ExtractJsonRegion));
        assert_eq!(result.value["pages"][0], "Home");
    }

    #[test]
    fn test_comma_before_bracket_inside_string_preserved() {
        // Only the final trailing comma is a defect; the comma-before-bracket
        // patterns inside the string literal are payload
        let raw = r#"{"files": [{"path": "a.ts", "content": "const x = [1, ]; const y = { a, };"}],}"#;
        let result = repair_and_parse(raw).unwrap();
        assert!(result.repairs.contains(&RepairStep::StripTrailingCommas));
        assert_eq!(
            result.value["files"][0]["content"],
            "const x = [1, ]; const y = { a, };"
        );
    }

    #[test]
    fn test_escaped_quote_does_not_break_string_tracking() {
        let raw = r#"{"content": "say \"hi, \" now",}"#;
        let result = repair_and_parse(raw).unwrap();
        assert_eq!(result.value["content"], "say \"hi, \" now");
    }

    #[test]
    fn test_smart_quotes_normalized() {
        let raw = "{\u{201c}name\u{201d}: \u{201c}app\u{201d}}";
        let result = repair_and_parse(raw).unwrap();
        assert!(result.repairs.contains(&RepairStep::NormalizeQuotes));
        assert_eq!(result.value["name"], "app");
    }

    #[test]
    fn test_truncated_output_closed() {
        let raw = "{\"files\": [{\"path\": \"src/pages/Home.tsx\", \"content\": \"export";
        let result = repair_and_parse(raw).unwrap();
        assert!(result.repairs.contains(&RepairStep::CloseTruncated));
        assert!(result.value["files"].is_array());
    }

    #[test]
    fn test_unrepairable_carries_preview() {
        let raw = "I'm sorry, I cannot produce that output.";
        let err = repair_and_parse(raw).unwrap_err();
        assert!(err.preview.starts_with("I'm sorry"));
        assert!(err.preview.chars().count() <= MAX_PREVIEW_CHARS);
    }

    #[test]
    fn test_preview_bounded_on_long_garbage() {
        let raw = "not json ".repeat(100);
        let err = repair_and_parse(&raw).unwrap_err();
        assert_eq!(err.preview.chars().count(), MAX_PREVIEW_CHARS);
    }

    #[test]
    fn test_nested_balanced_extraction() {
        let raw = "prefix {\"a\": {\"b\": [1, 2]}} suffix";
        let result = repair_and_parse(raw).unwrap();
        assert_eq!(result.value["a"]["b"][1], 2);
    }
}
