//! Candidate normalization
//!
//! Maps one candidate node onto a [`Record`] through per-field fallback chains.
//! Newer payloads move fields around (`core.screen_name` vs
//! `legacy.screen_name`, `note_tweet` long-form text), so every field lists the
//! current location first and older ones after it.

use serde_json::Value;

use super::chain;
use super::MalformedRecord;
use crate::models::{Author, MediaItem, Metrics, Record, ReplyTo};
use crate::time;

const ID_CHAIN: &[&str] = &["rest_id", "legacy.id_str", "legacy.id"];
const TEXT_CHAIN: &[&str] = &[
    "note_tweet.note_tweet_results.result.text",
    "legacy.full_text",
    "legacy.text",
];
const USER_ROOT: &str = "core.user_results.result";
const MEDIA_CHAIN: &[&str] = &["legacy.extended_entities.media", "legacy.entities.media"];

/// Normalize a candidate node into a record
pub fn normalize(node: &Value) -> Result<Record, MalformedRecord> {
    chain::object(node, "legacy")?;

    let id = chain::identifier(node, ID_CHAIN)?.ok_or(MalformedRecord::MissingId)?;
    let text = chain::string(node, TEXT_CHAIN)?.unwrap_or_default();
    let created_at = chain::string(node, &["legacy.created_at"])?
        .as_deref()
        .and_then(time::parse_created_at);

    let is_retweet = chain::lookup(node, "legacy.retweeted_status_result").is_some()
        || text.starts_with("RT @");
    let is_quote = match chain::boolean(node, &["legacy.is_quote_status"])? {
        Some(flag) => flag,
        None => chain::lookup(node, "quoted_status_result").is_some(),
    };
    let quoted_tweet_id = chain::identifier(
        node,
        &["legacy.quoted_status_id_str", "quoted_status_result.result.rest_id"],
    )?;

    Ok(Record {
        id,
        text,
        created_at,
        author: normalize_author(node)?,
        metrics: normalize_metrics(node)?,
        reply_to: ReplyTo {
            tweet_id: chain::identifier(node, &["legacy.in_reply_to_status_id_str"])?,
            user_id: chain::identifier(node, &["legacy.in_reply_to_user_id_str"])?,
            username: chain::string(node, &["legacy.in_reply_to_screen_name"])?,
        },
        is_retweet,
        is_quote,
        quoted_tweet_id,
        media: normalize_media(node)?,
        urls: collect_strings(node, "legacy.entities.urls", &["expanded_url", "url"])?,
        hashtags: collect_strings(node, "legacy.entities.hashtags", &["text"])?,
        mentions: collect_strings(node, "legacy.entities.user_mentions", &["screen_name"])?,
    })
}

fn normalize_author(node: &Value) -> Result<Author, MalformedRecord> {
    let Some(user) = chain::object(node, USER_ROOT)? else {
        return Ok(Author::default());
    };
    chain::object(user, "legacy")?;

    Ok(Author {
        id: chain::identifier(user, &["rest_id", "legacy.id_str"])?,
        username: chain::string(user, &["core.screen_name", "legacy.screen_name"])?,
        display_name: chain::string(user, &["core.name", "legacy.name"])?,
        verified: chain::boolean(user, &["is_blue_verified", "legacy.verified"])?.unwrap_or(false),
    })
}

fn normalize_metrics(node: &Value) -> Result<Metrics, MalformedRecord> {
    Ok(Metrics {
        retweet_count: chain::count(node, &["legacy.retweet_count"])?,
        reply_count: chain::count(node, &["legacy.reply_count"])?,
        like_count: chain::count(node, &["legacy.favorite_count", "legacy.like_count"])?,
        quote_count: chain::count(node, &["legacy.quote_count"])?,
    })
}

fn normalize_media(node: &Value) -> Result<Vec<MediaItem>, MalformedRecord> {
    let mut media = Vec::new();
    for item in chain::array(node, MEDIA_CHAIN)? {
        if !item.is_object() {
            continue;
        }
        let Some(url) = chain::string(item, &["media_url_https", "media_url"])? else {
            continue;
        };
        media.push(MediaItem {
            media_type: chain::string(item, &["type"])?.unwrap_or_else(|| "photo".to_string()),
            url,
            expanded_url: chain::string(item, &["expanded_url"])?,
        });
    }
    Ok(media)
}

/// Pull one string per entity object, preserving order; entities without it are skipped
fn collect_strings(
    node: &Value,
    entities_path: &'static str,
    field_chain: &[&'static str],
) -> Result<Vec<String>, MalformedRecord> {
    let mut values = Vec::new();
    for entity in chain::array(node, &[entities_path])? {
        if !entity.is_object() {
            continue;
        }
        if let Some(value) = chain::string(entity, field_chain)? {
            values.push(value);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_candidate() -> Value {
        json!({
            "__typename": "Tweet",
            "rest_id": "1800000000000000001",
            "core": {
                "user_results": {
                    "result": {
                        "__typename": "User",
                        "rest_id": "44196397",
                        "is_blue_verified": true,
                        "core": {"screen_name": "alice", "name": "Alice A."},
                        "legacy": {"screen_name": "old_alice", "name": "Old Alice"}
                    }
                }
            },
            "legacy": {
                "id_str": "1800000000000000001",
                "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                "full_text": "Reading about #rust with @bob https://t.co/x",
                "retweet_count": 3,
                "reply_count": 1,
                "favorite_count": 10,
                "quote_count": 2,
                "in_reply_to_status_id_str": "1799999999999999999",
                "in_reply_to_user_id_str": "12",
                "in_reply_to_screen_name": "carol",
                "is_quote_status": true,
                "quoted_status_id_str": "1700000000000000000",
                "entities": {
                    "hashtags": [{"text": "rust"}],
                    "user_mentions": [{"screen_name": "bob"}],
                    "urls": [{"url": "https://t.co/x", "expanded_url": "https://example.com/post"}]
                },
                "extended_entities": {
                    "media": [
                        {"type": "photo", "media_url_https": "https://pbs.twimg.com/media/1.jpg", "expanded_url": "https://x.com/alice/status/1/photo/1"},
                        {"type": "video"}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_normalize_full_candidate() {
        let record = normalize(&full_candidate()).unwrap();

        assert_eq!(record.id, "1800000000000000001");
        assert_eq!(record.text, "Reading about #rust with @bob https://t.co/x");
        assert!(record.created_at.is_some());
        assert_eq!(record.author.id.as_deref(), Some("44196397"));
        assert_eq!(record.author.username.as_deref(), Some("alice"));
        assert_eq!(record.author.display_name.as_deref(), Some("Alice A."));
        assert!(record.author.verified);
        assert_eq!(record.metrics.like_count, 10);
        assert_eq!(record.metrics.quote_count, 2);
        assert_eq!(record.reply_to.tweet_id.as_deref(), Some("1799999999999999999"));
        assert_eq!(record.reply_to.username.as_deref(), Some("carol"));
        assert!(record.is_quote);
        assert!(!record.is_retweet);
        assert_eq!(record.quoted_tweet_id.as_deref(), Some("1700000000000000000"));
        assert_eq!(record.hashtags, vec!["rust"]);
        assert_eq!(record.mentions, vec!["bob"]);
        assert_eq!(record.urls, vec!["https://example.com/post"]);
        // the video without a url is skipped
        assert_eq!(record.media.len(), 1);
        assert_eq!(record.media[0].media_type, "photo");
    }

    #[test]
    fn test_full_text_preferred_over_short_text() {
        let node = json!({"rest_id": "1", "legacy": {"full_text": "A", "text": "B"}});
        assert_eq!(normalize(&node).unwrap().text, "A");

        let node = json!({"rest_id": "1", "legacy": {"text": "B"}});
        assert_eq!(normalize(&node).unwrap().text, "B");

        let node = json!({"rest_id": "1", "legacy": {}});
        assert_eq!(normalize(&node).unwrap().text, "");
    }

    #[test]
    fn test_note_tweet_text_wins() {
        let node = json!({
            "rest_id": "1",
            "note_tweet": {"note_tweet_results": {"result": {"text": "the long version"}}},
            "legacy": {"full_text": "the long ver…"}
        });
        assert_eq!(normalize(&node).unwrap().text, "the long version");
    }

    #[test]
    fn test_id_falls_back_to_legacy_numeric() {
        let node = json!({"legacy": {"id": 20, "full_text": "just setting up my twttr"}});
        assert_eq!(normalize(&node).unwrap().id, "20");
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let node = json!({"__typename": "Tweet", "legacy": {"full_text": "orphan"}});
        assert_eq!(normalize(&node).unwrap_err(), MalformedRecord::MissingId);
    }

    #[test]
    fn test_legacy_author_fields_used_when_core_missing() {
        let node = json!({
            "rest_id": "5",
            "core": {"user_results": {"result": {
                "rest_id": "9",
                "legacy": {"screen_name": "dave", "name": "Dave", "verified": true}
            }}},
            "legacy": {"full_text": "hi"}
        });
        let author = normalize(&node).unwrap().author;
        assert_eq!(author.username.as_deref(), Some("dave"));
        assert_eq!(author.display_name.as_deref(), Some("Dave"));
        assert!(author.verified);
    }

    #[test]
    fn test_retweet_detected_from_text_prefix() {
        let node = json!({"rest_id": "6", "legacy": {"full_text": "RT @erin: original"}});
        assert!(normalize(&node).unwrap().is_retweet);
    }

    #[test]
    fn test_wrong_typed_legacy_is_malformed() {
        let node = json!({"__typename": "Tweet", "rest_id": "7", "legacy": "oops"});
        assert!(matches!(
            normalize(&node),
            Err(MalformedRecord::WrongType { .. })
        ));
    }

    #[test]
    fn test_unparseable_created_at_is_none() {
        let node = json!({"rest_id": "8", "legacy": {"full_text": "x", "created_at": "soon"}});
        assert!(normalize(&node).unwrap().created_at.is_none());
    }
}
