//! Filter prompt loading and record formatting

use std::path::Path;

use aerie_common::Record;
use tracing::{debug, warn};

/// Filter prompt used when no prompt file is given
pub const DEFAULT_PROMPT: &str = r#"You are a tweet filter assistant. Your job is to determine if a tweet should be shown to the user based on the following criteria:

SHOW tweets that are:
- Informative, educational, or genuinely interesting
- Positive or constructive discussions
- Creative content, humor, or entertainment
- Professional updates or industry news
- Personal updates from friends/mutuals that aren't negative

HIDE tweets that are:
- Ragebait or content designed to provoke outrage
- Doomposting or excessively negative content
- Political flamewars or tribal arguments
- Engagement farming ("ratio this", "hot take:", etc.)
- Crypto/NFT spam or get-rich-quick schemes
- Inflammatory hot takes designed for engagement
- Pile-ons or harassment campaigns

Respond with ONLY a JSON object in this exact format:
{"approved": true, "reason": "brief reason"}
or
{"approved": false, "reason": "brief reason"}

Do not include any other text before or after the JSON."#;

/// Load the filter prompt, falling back to [`DEFAULT_PROMPT`]
///
/// A missing or unreadable file is not an error.
pub fn load_prompt(prompt_file: Option<&Path>) -> String {
    let Some(path) = prompt_file else {
        return DEFAULT_PROMPT.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            debug!("Loaded prompt file: {}", path.display());
            content.trim().to_string()
        }
        Ok(_) => {
            warn!("Prompt file {} is empty, using default prompt", path.display());
            DEFAULT_PROMPT.to_string()
        }
        Err(e) => {
            warn!(
                "Could not read prompt file {} ({}), using default prompt",
                path.display(),
                e
            );
            DEFAULT_PROMPT.to_string()
        }
    }
}

/// Render a record as the text the judge sees
///
/// Author line, body, then context markers and non-zero engagement.
pub fn format_record(record: &Record) -> String {
    let mut parts = Vec::new();

    let username = record.author.username.as_deref().unwrap_or("unknown");
    let display_name = record.author.display_name.as_deref().unwrap_or(username);
    let mut author_line = format!("@{} ({})", username, display_name);
    if record.author.verified {
        author_line.push_str(" [verified]");
    }
    parts.push(author_line);

    parts.push(record.text.clone());

    if record.is_retweet {
        parts.push("[This is a retweet]".to_string());
    }
    if record.is_quote {
        parts.push("[This is a quote tweet]".to_string());
    }
    if let Some(target) = &record.reply_to.username {
        parts.push(format!("[Replying to @{}]", target));
    }

    let metrics = &record.metrics;
    let engagement: Vec<String> = [
        (metrics.like_count, "likes"),
        (metrics.retweet_count, "retweets"),
        (metrics.reply_count, "replies"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{} {}", count, label))
    .collect();
    if !engagement.is_empty() {
        parts.push(format!("[{}]", engagement.join(", ")));
    }

    parts.join("\n")
}

/// First `max_chars` characters, with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerie_common::models::{Author, Metrics};

    #[test]
    fn test_format_full_record() {
        let mut record = Record::new("1", "Shipping a new release today");
        record.author = Author {
            id: Some("9".to_string()),
            username: Some("alice".to_string()),
            display_name: Some("Alice".to_string()),
            verified: true,
        };
        record.is_quote = true;
        record.reply_to.username = Some("bob".to_string());
        record.metrics = Metrics {
            retweet_count: 3,
            reply_count: 0,
            like_count: 12,
            quote_count: 1,
        };

        assert_eq!(
            format_record(&record),
            "@alice (Alice) [verified]\n\
             Shipping a new release today\n\
             [This is a quote tweet]\n\
             [Replying to @bob]\n\
             [12 likes, 3 retweets]"
        );
    }

    #[test]
    fn test_format_minimal_record() {
        let record = Record::new("1", "hello");
        assert_eq!(format_record(&record), "@unknown (unknown)\nhello");
    }

    #[test]
    fn test_display_name_defaults_to_username() {
        let mut record = Record::new("1", "RT @carol: hi");
        record.author.username = Some("dave".to_string());
        record.is_retweet = true;
        assert_eq!(
            format_record(&record),
            "@dave (dave)\nRT @carol: hi\n[This is a retweet]"
        );
    }

    #[test]
    fn test_load_prompt_missing_file_uses_default() {
        let prompt = load_prompt(Some(Path::new("/nonexistent/aerie/prompt.txt")));
        assert_eq!(prompt, DEFAULT_PROMPT);
        assert_eq!(load_prompt(None), DEFAULT_PROMPT);
    }

    #[test]
    fn test_load_prompt_from_file_is_trimmed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "\n  Only show posts about Rust.  \n").unwrap();
        assert_eq!(load_prompt(Some(&path)), "Only show posts about Rust.");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }
}
