//! Verdict parsing from free-form model output
//!
//! Tried in order: the whole reply as a JSON object, the first `{...}` span in
//! the reply, the keywords `approved`/`true`/`false`, and finally approval with
//! the unparsed reply quoted in the reason.

use serde_json::Value;

use crate::judge::Verdict;

const DEFAULT_REASON: &str = "No reason provided";
const UNPARSED_PREVIEW_CHARS: usize = 100;

/// Parse a model reply into a verdict; never fails
pub fn parse_verdict(content: &str) -> Verdict {
    let content = content.trim();

    if let Some(verdict) = from_json(content) {
        return verdict;
    }

    if let Some(verdict) = embedded_object(content).and_then(from_json) {
        return verdict;
    }

    let lower = content.to_lowercase();
    if lower.contains("approved") && lower.contains("true") {
        return Verdict::approve("LLM indicated approval");
    }
    if lower.contains("approved") && lower.contains("false") {
        return Verdict::filter("LLM indicated rejection");
    }

    let head: String = content.chars().take(UNPARSED_PREVIEW_CHARS).collect();
    Verdict::approve(format!(
        "Could not parse response, defaulting to approved: {}",
        head
    ))
}

fn from_json(text: &str) -> Option<Verdict> {
    let Value::Object(map) = serde_json::from_str::<Value>(text).ok()? else {
        return None;
    };

    Some(Verdict {
        approved: map.get("approved").and_then(Value::as_bool).unwrap_or(true),
        reason: map
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REASON)
            .to_string(),
    })
}

/// First `{` followed by at least one non-`}` character and a closing `}`
fn embedded_object(text: &str) -> Option<&str> {
    for (start, _) in text.match_indices('{') {
        let rest = &text[start + 1..];
        match rest.find('}') {
            Some(0) => continue,
            Some(len) => return Some(&text[start..start + len + 2]),
            None => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_json() {
        let verdict = parse_verdict(r#"{"approved": false, "reason": "ragebait"}"#);
        assert_eq!(verdict, Verdict::filter("ragebait"));
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let verdict = parse_verdict(
            "Sure! Here is my answer:\n{\"approved\": true, \"reason\": \"informative\"}\nHope that helps.",
        );
        assert_eq!(verdict, Verdict::approve("informative"));
    }

    #[test]
    fn test_missing_fields_default() {
        let verdict = parse_verdict("{}");
        assert_eq!(verdict, Verdict::approve(DEFAULT_REASON));

        let verdict = parse_verdict(r#"{"approved": false}"#);
        assert_eq!(verdict, Verdict::filter(DEFAULT_REASON));
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(
            parse_verdict("approved: true because it is useful"),
            Verdict::approve("LLM indicated approval")
        );
        assert_eq!(
            parse_verdict("Approved = FALSE"),
            Verdict::filter("LLM indicated rejection")
        );
    }

    #[test]
    fn test_unparseable_defaults_to_approve() {
        let verdict = parse_verdict("I cannot decide.");
        assert!(verdict.approved);
        assert!(verdict.reason.starts_with("Could not parse response"));
        assert!(verdict.reason.ends_with("I cannot decide."));
    }

    #[test]
    fn test_embedded_object_span() {
        assert_eq!(embedded_object("a {} b {x} c"), Some("{x}"));
        assert_eq!(embedded_object("no braces"), None);
        assert_eq!(embedded_object("{ unterminated"), None);
    }

    #[test]
    fn test_broken_embedded_json_falls_through_to_keywords() {
        let verdict = parse_verdict("verdict {approved: false} (not json)");
        assert_eq!(verdict, Verdict::filter("LLM indicated rejection"));
    }
}
