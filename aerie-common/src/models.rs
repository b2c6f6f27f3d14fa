//! Record models shared by the collector, classifier and sync client
//!
//! Field names on the wire follow the capture format the browser extension
//! posts to the collector (`author.display_name`, `reply_to.tweet_id`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{time, Error};

/// Classification state of a stored record
///
/// One-way: `Pending` → `Approved` | `Filtered`. Leaving a terminal state
/// requires an explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStatus {
    Pending,
    Approved,
    Filtered,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStatus::Pending => "pending",
            ClassificationStatus::Approved => "approved",
            ClassificationStatus::Filtered => "filtered",
        }
    }

    /// Status produced by a verdict
    pub fn from_verdict(approved: bool) -> Self {
        if approved {
            ClassificationStatus::Approved
        } else {
            ClassificationStatus::Filtered
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClassificationStatus::Pending)
    }
}

impl fmt::Display for ClassificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClassificationStatus::Pending),
            "approved" => Ok(ClassificationStatus::Approved),
            "filtered" => Ok(ClassificationStatus::Filtered),
            other => Err(Error::Internal(format!(
                "Unknown classification status: {}",
                other
            ))),
        }
    }
}

/// Answer to a status lookup
///
/// `Unknown` means the id has never been ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Approved,
    Filtered,
    Unknown,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Filtered => "filtered",
            RecordStatus::Unknown => "unknown",
        }
    }

    /// Approved and filtered are final for a session
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Approved | RecordStatus::Filtered)
    }
}

impl From<ClassificationStatus> for RecordStatus {
    fn from(status: ClassificationStatus) -> Self {
        match status {
            ClassificationStatus::Pending => RecordStatus::Pending,
            ClassificationStatus::Approved => RecordStatus::Approved,
            ClassificationStatus::Filtered => RecordStatus::Filtered,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub verified: bool,
}

/// Engagement counters at capture time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, deserialize_with = "null_as_default")]
    pub retweet_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quote_count: i64,
}

/// Reply threading target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
    #[serde(default)]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ReplyTo {
    pub fn is_empty(&self) -> bool {
        self.tweet_id.is_none() && self.user_id.is_none() && self.username.is_none()
    }
}

/// Attached photo, video or animated gif
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type", default = "default_media_type")]
    pub media_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_url: Option<String>,
}

fn default_media_type() -> String {
    "photo".to_string()
}

/// Canonical normalized record, as produced by the extractor and accepted by ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: Metrics,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reply_to: ReplyTo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_retweet: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_quote: bool,
    #[serde(default)]
    pub quoted_tweet_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media: Vec<MediaItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urls: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashtags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mentions: Vec<String>,
}

impl Record {
    /// Minimal record with only id and text set
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: None,
            author: Author::default(),
            metrics: Metrics::default(),
            reply_to: ReplyTo::default(),
            is_retweet: false,
            is_quote: false,
            quoted_tweet_id: None,
            media: Vec::new(),
            urls: Vec::new(),
            hashtags: Vec::new(),
            mentions: Vec::new(),
        }
    }
}

/// A record as persisted by the store, with capture and classification state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: Record,
    pub captured_at: DateTime<Utc>,
    pub classification_status: ClassificationStatus,
    pub classification_reason: Option<String>,
    pub classified_at: Option<DateTime<Utc>>,
}

/// Result of an ingest call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub inserted: u64,
    pub duplicates: u64,
}

/// Record counts per classification status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub filtered: i64,
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 or the legacy X date format; unparseable strings become `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(time::parse_created_at))
}
