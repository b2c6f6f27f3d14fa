//! Classification driver
//!
//! One run draws up to `max_count` pending records, oldest first, and judges
//! them one at a time. A transient judge failure ends the run at that record;
//! everything not yet judged stays pending for the next run. A permanent
//! failure skips only the record at hand.

use aerie_common::db::SetClassification;
use aerie_common::Store;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::judge::{Judge, JudgeError, JudgeRequest, Verdict};
use crate::prompt::{format_record, preview};

const PREVIEW_CHARS: usize = 50;

/// Driver failures
#[derive(Debug, Error)]
pub enum DriverError {
    /// Store read or write failed; verdicts already written stay written
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] aerie_common::Error),
}

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_count: u32,
    pub model: String,
    /// Judge but persist nothing
    pub dry_run: bool,
    /// Log every record and decision at info level
    pub verbose: bool,
}

/// What a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records sent to the judge
    pub considered: u32,
    pub approved: u32,
    pub filtered: u32,
    /// Permanent judge failures
    pub skipped: u32,
    /// Verdicts the store refused because the record was already classified
    pub rejected: u32,
    /// A transient failure ended the run before the batch was done
    pub stopped_early: bool,
}

/// Runs judgments over pending records
pub struct ClassificationDriver<J> {
    store: Store,
    judge: J,
}

impl<J: Judge> ClassificationDriver<J> {
    pub fn new(store: Store, judge: J) -> Self {
        Self { store, judge }
    }

    pub fn judge(&self) -> &J {
        &self.judge
    }

    /// Classify up to `options.max_count` pending records with `prompt`
    pub async fn run(&self, prompt: &str, options: &RunOptions) -> Result<RunSummary, DriverError> {
        let mut summary = RunSummary::default();
        let pending = self.store.list_pending(options.max_count).await?;
        let total = pending.len();

        if total == 0 {
            info!("No pending records to classify");
            return Ok(summary);
        }
        info!(count = total, dry_run = options.dry_run, "Classifying pending records");

        for (index, stored) in pending.iter().enumerate() {
            let record = &stored.record;
            let author = record.author.username.as_deref().unwrap_or("unknown");
            let text_preview = preview(&record.text, PREVIEW_CHARS);
            if options.verbose {
                info!("[{}/{}] @{}: {}", index + 1, total, author, text_preview);
            } else {
                debug!(id = %record.id, "[{}/{}] @{}: {}", index + 1, total, author, text_preview);
            }

            let text = format_record(record);
            let request = JudgeRequest {
                text: &text,
                prompt,
                model: &options.model,
            };
            summary.considered += 1;

            let verdict = match self.judge.judge(request).await {
                Ok(verdict) => verdict,
                Err(JudgeError::Transient(message)) => {
                    warn!(
                        id = %record.id,
                        remaining = total - index,
                        error = %message,
                        "Transient provider error, stopping run"
                    );
                    summary.stopped_early = true;
                    break;
                }
                Err(JudgeError::Permanent(message)) => {
                    warn!(id = %record.id, error = %message, "Provider rejected record, skipping");
                    summary.skipped += 1;
                    continue;
                }
            };

            self.log_decision(&record.id, &verdict, options.verbose);

            if options.dry_run {
                summary.count(verdict.approved);
                continue;
            }

            match self
                .store
                .set_classification(&record.id, verdict.approved, Some(verdict.reason.as_str()), false)
                .await?
            {
                SetClassification::Applied { .. } => summary.count(verdict.approved),
                SetClassification::Rejected { existing } => {
                    debug!(id = %record.id, existing = %existing, "Record classified elsewhere");
                    summary.rejected += 1;
                }
                SetClassification::NotFound => {
                    warn!(id = %record.id, "Record disappeared before classification");
                    summary.rejected += 1;
                }
            }
        }

        info!(
            considered = summary.considered,
            approved = summary.approved,
            filtered = summary.filtered,
            skipped = summary.skipped,
            rejected = summary.rejected,
            stopped_early = summary.stopped_early,
            "Classification run complete"
        );

        Ok(summary)
    }

    fn log_decision(&self, id: &str, verdict: &Verdict, verbose: bool) {
        let label = if verdict.approved { "APPROVED" } else { "FILTERED" };
        if verbose {
            info!("  -> {}: {}", label, verdict.reason);
        } else {
            debug!(id, "{}: {}", label, verdict.reason);
        }
    }
}

impl RunSummary {
    fn count(&mut self, approved: bool) {
        if approved {
            self.approved += 1;
        } else {
            self.filtered += 1;
        }
    }
}
