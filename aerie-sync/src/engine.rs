//! Reconciliation engine
//!
//! One task owns the cache, the host and the status source. It wakes on host
//! change notifications, on the retry timer and on finished lookups; lookups
//! run as futures polled by the same loop, so a slow backend never holds up
//! the next pass.
//!
//! A pass walks the live handles, shows cached statuses immediately and sends
//! every id the cache has not seen in one batched lookup. Timer passes also
//! re-ask about ids still pending or unknown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aerie_common::config::SyncConfig;
use aerie_common::RecordStatus;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::SyncCache;
use crate::error::SyncResult;
use crate::host::HandleHost;
use crate::source::StatusSource;

/// Shortest retry period the engine accepts
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(100);

type Lookup = BoxFuture<'static, (Vec<String>, SyncResult<HashMap<String, RecordStatus>>)>;

/// Host side of the change channel
///
/// Notifications coalesce: any number sent before the engine wakes cause a
/// single pass.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<()>,
}

impl ChangeNotifier {
    /// Signal that the host's handle set changed; never blocks
    pub fn notify(&self) {
        // Full means a pass is already due; Closed means the engine is gone
        let _ = self.tx.try_send(());
    }
}

/// Engine side of the change channel
#[derive(Debug)]
pub struct ChangeReceiver {
    rx: mpsc::Receiver<()>,
}

impl ChangeReceiver {
    async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// Create a change channel; dropping every notifier stops the engine
pub fn change_channel() -> (ChangeNotifier, ChangeReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ChangeNotifier { tx }, ChangeReceiver { rx })
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Batched lookups sent
    pub queries: u64,
    /// Ids across all lookups
    pub ids_queried: u64,
    /// Statuses shown straight from the cache
    pub cache_hits: u64,
    /// Statuses applied from lookup answers
    pub applied: u64,
    /// Lookups that failed
    pub failures: u64,
}

pub struct SyncEngine<H, S> {
    host: H,
    source: Arc<S>,
    cache: SyncCache,
    retry_interval: Duration,
    lookups: FuturesUnordered<Lookup>,
    stats: SyncStats,
}

impl<H, S> SyncEngine<H, S>
where
    H: HandleHost,
    S: StatusSource + 'static,
{
    /// Periods below [`MIN_RETRY_INTERVAL`] are raised to it
    pub fn new(host: H, source: Arc<S>, retry_interval: Duration) -> Self {
        if retry_interval < MIN_RETRY_INTERVAL {
            warn!(
                requested_ms = retry_interval.as_millis() as u64,
                "Retry interval too short, using {}ms",
                MIN_RETRY_INTERVAL.as_millis()
            );
        }
        let retry_interval = retry_interval.max(MIN_RETRY_INTERVAL);

        Self {
            host,
            source,
            cache: SyncCache::new(),
            retry_interval,
            lookups: FuturesUnordered::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn with_config(host: H, source: Arc<S>, config: &SyncConfig) -> Self {
        Self::new(host, source, Duration::from_millis(config.retry_interval_ms))
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn cache(&self) -> &SyncCache {
        &self.cache
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Lookups sent but not yet answered
    pub fn pending_lookups(&self) -> usize {
        self.lookups.len()
    }

    /// Seed the cache from the classified-ids snapshot
    pub async fn bootstrap(&mut self) -> SyncResult<usize> {
        let snapshot = self.source.classified_ids().await?;
        let total = snapshot.len();
        let seeded = self.cache.bootstrap(snapshot);
        info!(total, seeded, "Status cache bootstrapped");
        Ok(seeded)
    }

    /// One reconciliation pass; returns the number of ids sent for lookup
    pub fn reconcile(&mut self, include_retry: bool) -> usize {
        for handle in self.host.live_handles() {
            let Some(id) = self.host.record_id(&handle) else {
                continue;
            };
            if let Some(status) = self.cache.observe(&id) {
                if self.apply(&handle, status) {
                    self.stats.cache_hits += 1;
                }
            }
        }

        let batch = self.cache.take_batch(include_retry);
        let count = batch.len();
        if count > 0 {
            self.send_lookup(batch);
        }
        count
    }

    /// Wait for every lookup in flight and fold in the answers
    pub async fn settle(&mut self) {
        while let Some((ids, result)) = self.lookups.next().await {
            self.complete(ids, result);
        }
    }

    /// Drive the engine until every [`ChangeNotifier`] is dropped
    pub async fn run(mut self, mut changes: ChangeReceiver) -> SyncStats {
        if let Err(e) = self.bootstrap().await {
            warn!(error = %e, "Status cache bootstrap failed, continuing with an empty cache");
        }

        let mut retry = tokio::time::interval(self.retry_interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Some(()) => {
                        self.reconcile(false);
                    }
                    None => {
                        debug!("Change channel closed");
                        break;
                    }
                },
                _ = retry.tick() => {
                    self.reconcile(true);
                }
                Some((ids, result)) = self.lookups.next(), if !self.lookups.is_empty() => {
                    self.complete(ids, result);
                }
            }
        }

        info!(
            queries = self.stats.queries,
            ids_queried = self.stats.ids_queried,
            cache_hits = self.stats.cache_hits,
            applied = self.stats.applied,
            failures = self.stats.failures,
            "Sync engine stopped"
        );
        self.stats
    }

    fn send_lookup(&mut self, batch: Vec<String>) {
        debug!(count = batch.len(), "Sending status lookup");
        self.stats.queries += 1;
        self.stats.ids_queried += batch.len() as u64;

        let source = Arc::clone(&self.source);
        self.lookups.push(Box::pin(async move {
            let result = source.check_status(&batch).await;
            (batch, result)
        }));
    }

    fn complete(&mut self, ids: Vec<String>, result: SyncResult<HashMap<String, RecordStatus>>) {
        let answers = match result {
            Ok(answers) => answers,
            Err(e) => {
                warn!(count = ids.len(), error = %e, "Status lookup failed, will retry");
                self.stats.failures += 1;
                self.cache.fail(&ids);
                return;
            }
        };

        let resolved: HashMap<String, RecordStatus> =
            self.cache.resolve(&ids, &answers).into_iter().collect();

        // Handles destroyed meanwhile simply are not in the live set
        for handle in self.host.live_handles() {
            let Some(id) = self.host.record_id(&handle) else {
                continue;
            };
            if let Some(status) = resolved.get(&id) {
                if self.apply(&handle, *status) {
                    self.stats.applied += 1;
                }
            }
        }
    }

    /// Apply a status unless the handle already shows it
    fn apply(&mut self, handle: &H::Handle, status: RecordStatus) -> bool {
        if self.host.applied_status(handle) == Some(status) {
            return false;
        }
        self.host.apply_status(handle, status);
        true
    }
}
