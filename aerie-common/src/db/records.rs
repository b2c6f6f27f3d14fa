//! Record store
//!
//! Authoritative table of captured records and their classification state.
//! Insert-if-absent dedup on ingest; one-way `pending` → `approved | filtered`
//! transition unless an override is requested.

use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::init::init_database;
use super::retry::retry_on_lock;
use crate::models::{
    Author, ClassificationStatus, IngestOutcome, Metrics, Record, RecordStatus, ReplyTo,
    StoreStats, StoredRecord,
};
use crate::{time, Error, Result};

/// Ids bound per `IN (...)` statement
const STATUS_CHUNK_SIZE: usize = 500;

/// Default upper bound for lock retries on writes
const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Reason written by the administrative bulk approve
pub const AUTO_APPROVED_REASON: &str = "auto-approved";

const SELECT_COLUMNS: &str = r#"
    id, text, created_at, captured_at,
    author_id, author_username, author_display_name, author_verified,
    retweet_count, reply_count, like_count, quote_count,
    reply_to_tweet_id, reply_to_user_id, reply_to_username,
    is_retweet, is_quote, quoted_tweet_id,
    media_json, urls_json, hashtags_json, mentions_json,
    classification_status, classification_reason, classified_at
"#;

/// Outcome of a classification write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SetClassification {
    /// Status written
    Applied { status: ClassificationStatus },
    /// Record already classified and no override requested; nothing changed
    Rejected { existing: ClassificationStatus },
    /// No record with that id
    NotFound,
}

/// SQLite-backed record store
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl Store {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an already-initialized pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert records whose id is not yet stored
    ///
    /// New rows start `pending` with `captured_at` set to now. Existing rows are
    /// never touched; they (and repeats within the batch) count as duplicates.
    pub async fn ingest(&self, records: &[Record]) -> Result<IngestOutcome> {
        if records.is_empty() {
            return Ok(IngestOutcome::default());
        }

        let rows = records
            .iter()
            .map(RecordRow::from_record)
            .collect::<Result<Vec<_>>>()?;
        let rows = &rows;
        let pool = &self.pool;

        let outcome = retry_on_lock("ingest", self.max_lock_wait_ms, || async move {
            let captured_at = time::to_storage(&time::now());
            let mut outcome = IngestOutcome::default();
            let mut tx = pool.begin().await?;

            for row in rows {
                let result = sqlx::query(
                    r#"
                    INSERT INTO tweets (
                        id, text, created_at, captured_at,
                        author_id, author_username, author_display_name, author_verified,
                        retweet_count, reply_count, like_count, quote_count,
                        reply_to_tweet_id, reply_to_user_id, reply_to_username,
                        is_retweet, is_quote, quoted_tweet_id,
                        media_json, urls_json, hashtags_json, mentions_json,
                        classification_status
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
                    ON CONFLICT(id) DO NOTHING
                    "#,
                )
                .bind(&row.record.id)
                .bind(&row.record.text)
                .bind(row.created_at.as_deref())
                .bind(&captured_at)
                .bind(row.record.author.id.as_deref())
                .bind(row.record.author.username.as_deref())
                .bind(row.record.author.display_name.as_deref())
                .bind(row.record.author.verified)
                .bind(row.record.metrics.retweet_count)
                .bind(row.record.metrics.reply_count)
                .bind(row.record.metrics.like_count)
                .bind(row.record.metrics.quote_count)
                .bind(row.record.reply_to.tweet_id.as_deref())
                .bind(row.record.reply_to.user_id.as_deref())
                .bind(row.record.reply_to.username.as_deref())
                .bind(row.record.is_retweet)
                .bind(row.record.is_quote)
                .bind(row.record.quoted_tweet_id.as_deref())
                .bind(&row.media_json)
                .bind(&row.urls_json)
                .bind(&row.hashtags_json)
                .bind(&row.mentions_json)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 1 {
                    outcome.inserted += 1;
                } else {
                    outcome.duplicates += 1;
                }
            }

            tx.commit().await?;
            Ok::<_, Error>(outcome)
        })
        .await?;

        tracing::debug!(
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            "Ingested records"
        );

        Ok(outcome)
    }

    /// Look up the status of each id; ids never ingested answer `Unknown`
    ///
    /// All chunks are read inside one transaction, so a call sees one snapshot.
    pub async fn check_status(&self, ids: &[String]) -> Result<HashMap<String, RecordStatus>> {
        let mut statuses = HashMap::with_capacity(ids.len());
        if ids.is_empty() {
            return Ok(statuses);
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let mut tx = self.pool.begin().await?;
        for chunk in unique.chunks(STATUS_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT id, classification_status FROM tweets WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id.to_string());
            }
            separated.push_unseparated(")");

            let rows = builder.build().fetch_all(&mut *tx).await?;
            for row in rows {
                let id: String = row.try_get("id")?;
                let status: String = row.try_get("classification_status")?;
                statuses.insert(id, status.parse::<ClassificationStatus>()?.into());
            }
        }
        tx.commit().await?;

        for id in unique {
            statuses
                .entry(id.clone())
                .or_insert(RecordStatus::Unknown);
        }

        Ok(statuses)
    }

    /// All classified (non-pending) ids, for client cache bootstrap
    pub async fn list_classified_ids(&self) -> Result<HashMap<String, ClassificationStatus>> {
        let rows = sqlx::query(
            "SELECT id, classification_status FROM tweets WHERE classification_status != 'pending'",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<(String, ClassificationStatus)> {
                let id: String = row.try_get("id")?;
                let status: String = row.try_get("classification_status")?;
                Ok((id, status.parse()?))
            })
            .collect()
    }

    /// Pending records, oldest captured first
    pub async fn list_pending(&self, limit: u32) -> Result<Vec<StoredRecord>> {
        let sql = format!(
            "SELECT {} FROM tweets WHERE classification_status = 'pending' \
             ORDER BY captured_at ASC, rowid ASC LIMIT ?",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_stored_record).collect()
    }

    /// Approved records, newest first
    pub async fn list_approved(&self, limit: u32, offset: u32) -> Result<Vec<StoredRecord>> {
        let sql = format!(
            "SELECT {} FROM tweets WHERE classification_status = 'approved' \
             ORDER BY created_at DESC, captured_at DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_stored_record).collect()
    }

    /// Load one record by id
    pub async fn get(&self, id: &str) -> Result<Option<StoredRecord>> {
        let sql = format!("SELECT {} FROM tweets WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_stored_record).transpose()
    }

    /// Record a classification verdict
    ///
    /// Without `override_existing`, only a `pending` record transitions; an
    /// already-classified record is left as is and `Rejected` is returned. With
    /// the override, status, reason and timestamp are all replaced.
    pub async fn set_classification(
        &self,
        id: &str,
        approved: bool,
        reason: Option<&str>,
        override_existing: bool,
    ) -> Result<SetClassification> {
        let status = ClassificationStatus::from_verdict(approved);
        let sql = if override_existing {
            r#"
            UPDATE tweets SET
                classification_status = ?,
                classification_reason = ?,
                classified_at = ?
            WHERE id = ?
            "#
        } else {
            r#"
            UPDATE tweets SET
                classification_status = ?,
                classification_reason = ?,
                classified_at = ?
            WHERE id = ? AND classification_status = 'pending'
            "#
        };
        let pool = &self.pool;

        let affected = retry_on_lock("set_classification", self.max_lock_wait_ms, || async move {
            let classified_at = time::to_storage(&time::now());
            let result = sqlx::query(sql)
                .bind(status.as_str())
                .bind(reason)
                .bind(&classified_at)
                .bind(id)
                .execute(pool)
                .await?;
            Ok::<_, Error>(result.rows_affected())
        })
        .await?;

        if affected > 0 {
            return Ok(SetClassification::Applied { status });
        }

        let existing: Option<String> =
            sqlx::query_scalar("SELECT classification_status FROM tweets WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            None => Ok(SetClassification::NotFound),
            Some(existing) => {
                let existing: ClassificationStatus = existing.parse()?;
                tracing::warn!(
                    id,
                    existing = %existing,
                    requested = %status,
                    "Rejected duplicate classification attempt"
                );
                Ok(SetClassification::Rejected { existing })
            }
        }
    }

    /// Approve every pending record; returns how many changed
    pub async fn approve_all_pending(&self) -> Result<u64> {
        let pool = &self.pool;

        let approved = retry_on_lock("approve_all_pending", self.max_lock_wait_ms, || async move {
            let classified_at = time::to_storage(&time::now());
            let result = sqlx::query(
                r#"
                UPDATE tweets SET
                    classification_status = 'approved',
                    classification_reason = ?,
                    classified_at = ?
                WHERE classification_status = 'pending'
                "#,
            )
            .bind(AUTO_APPROVED_REASON)
            .bind(&classified_at)
            .execute(pool)
            .await?;
            Ok::<_, Error>(result.rows_affected())
        })
        .await?;

        tracing::info!(approved, "Bulk-approved pending records");
        Ok(approved)
    }

    /// Record counts per status
    pub async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN classification_status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN classification_status = 'approved' THEN 1 ELSE 0 END), 0) AS approved,
                COALESCE(SUM(CASE WHEN classification_status = 'filtered' THEN 1 ELSE 0 END), 0) AS filtered
            FROM tweets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total: row.try_get("total")?,
            pending: row.try_get("pending")?,
            approved: row.try_get("approved")?,
            filtered: row.try_get("filtered")?,
        })
    }

    /// Log one raw capture submission; returns the session id
    pub async fn record_capture_session(
        &self,
        source_url: Option<&str>,
        tweet_count: u64,
    ) -> Result<i64> {
        let started_at = time::to_storage(&time::now());
        let tweet_count = i64::try_from(tweet_count)
            .map_err(|_| Error::InvalidInput(format!("tweet_count out of range: {}", tweet_count)))?;

        let result = sqlx::query(
            "INSERT INTO capture_sessions (started_at, source_url, tweet_count) VALUES (?, ?, ?)",
        )
        .bind(&started_at)
        .bind(source_url)
        .bind(tweet_count)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

/// A record with its JSON columns serialized ahead of the write
struct RecordRow<'a> {
    record: &'a Record,
    created_at: Option<String>,
    media_json: String,
    urls_json: String,
    hashtags_json: String,
    mentions_json: String,
}

impl<'a> RecordRow<'a> {
    fn from_record(record: &'a Record) -> Result<Self> {
        if record.id.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".to_string()));
        }

        Ok(Self {
            record,
            created_at: record.created_at.as_ref().map(time::to_storage),
            media_json: to_json(&record.media, "media")?,
            urls_json: to_json(&record.urls, "urls")?,
            hashtags_json: to_json(&record.hashtags, "hashtags")?,
            mentions_json: to_json(&record.mentions, "mentions")?,
        })
    }
}

fn to_json<T: Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", field, e)))
}

fn from_json<T: serde::de::DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

fn parse_timestamp(raw: Option<String>, column: &str) -> Result<Option<chrono::DateTime<Utc>>> {
    match raw {
        None => Ok(None),
        Some(value) => time::from_storage(&value)
            .map(Some)
            .ok_or_else(|| Error::Internal(format!("Failed to parse {}: {}", column, value))),
    }
}

fn row_to_stored_record(row: &SqliteRow) -> Result<StoredRecord> {
    let status: String = row.try_get("classification_status")?;
    let captured_at = parse_timestamp(row.try_get("captured_at")?, "captured_at")?
        .ok_or_else(|| Error::Internal("captured_at is NULL".to_string()))?;

    Ok(StoredRecord {
        record: Record {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            created_at: parse_timestamp(row.try_get("created_at")?, "created_at")?,
            author: Author {
                id: row.try_get("author_id")?,
                username: row.try_get("author_username")?,
                display_name: row.try_get("author_display_name")?,
                verified: row.try_get("author_verified")?,
            },
            metrics: Metrics {
                retweet_count: row.try_get("retweet_count")?,
                reply_count: row.try_get("reply_count")?,
                like_count: row.try_get("like_count")?,
                quote_count: row.try_get("quote_count")?,
            },
            reply_to: ReplyTo {
                tweet_id: row.try_get("reply_to_tweet_id")?,
                user_id: row.try_get("reply_to_user_id")?,
                username: row.try_get("reply_to_username")?,
            },
            is_retweet: row.try_get("is_retweet")?,
            is_quote: row.try_get("is_quote")?,
            quoted_tweet_id: row.try_get("quoted_tweet_id")?,
            media: from_json(row, "media_json")?,
            urls: from_json(row, "urls_json")?,
            hashtags: from_json(row, "hashtags_json")?,
            mentions: from_json(row, "mentions_json")?,
        },
        captured_at,
        classification_status: status.parse()?,
        classification_reason: row.try_get("classification_reason")?,
        classified_at: parse_timestamp(row.try_get("classified_at")?, "classified_at")?,
    })
}
