//! Guardrail applied to every generated text before it is surfaced.
//!
//! Rejections are a policy outcome, not an error: the text is replaced by a
//! fixed placeholder and logged at debug level only.

use tracing::debug;

/// Returned when the backend produced no usable text payload.
pub const INVALID_RESPONSE: &str = "Invalid model response.";

/// Returned when the text contains a blocked term.
pub const SKIPPED_RESPONSE: &str = "Response skipped due to invalid output.";

/// Maximum length of surfaced text, in characters.
pub const MAX_OUTPUT_CHARS: usize = 800;

/// Markup, script, code-execution and stack-trace markers. Lowercase;
/// matched case-insensitively.
const BLOCKED_TERMS: &[&str] = &[
    "<html>",
    "</script>",
    "import ",
    "traceback (most recent call)",
];

/// Sanitize a backend payload that may be missing or non-textual.
pub fn sanitize_output(raw: Option<&str>) -> String {
    match raw {
        Some(text) => sanitize(text),
        None => INVALID_RESPONSE.to_string(),
    }
}

/// Reject text containing a blocked term; otherwise trim it and cut it to
/// [`MAX_OUTPUT_CHARS`] characters.
///
/// Idempotent: whitespace exposed by the cut is trimmed too, so sanitizing
/// an already sanitized string returns it unchanged.
pub fn sanitize(text: &str) -> String {
    let lowered = text.to_lowercase();
    if let Some(term) = BLOCKED_TERMS.iter().find(|t| lowered.contains(*t)) {
        debug!(term = %term, "generated text rejected by output filter");
        return SKIPPED_RESPONSE.to_string();
    }

    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Cut `text` to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
