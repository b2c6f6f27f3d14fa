//! Session status cache
//!
//! Per id: `unknown` → `pending` → `approved` | `filtered`. Terminal values are
//! never overwritten for the life of the cache, whatever a later lookup says.
//!
//! Ids needing a lookup sit in one of two sets. The discovery set holds ids
//! seen on a handle but never asked about; the retry set holds ids whose last
//! answer was pending or unknown, or whose lookup failed. An id that is in
//! flight is in neither and is not handed out again until its answer lands.

use std::collections::{BTreeSet, HashMap, HashSet};

use aerie_common::{ClassificationStatus, RecordStatus};

#[derive(Debug, Default)]
pub struct SyncCache {
    statuses: HashMap<String, RecordStatus>,
    discovered: BTreeSet<String>,
    retry: BTreeSet<String>,
    in_flight: HashSet<String>,
}

impl SyncCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed terminal statuses from a classified-ids snapshot
    pub fn bootstrap(&mut self, snapshot: HashMap<String, ClassificationStatus>) -> usize {
        let mut seeded = 0;
        for (id, status) in snapshot {
            if self.store(id, status.into()) {
                seeded += 1;
            }
        }
        seeded
    }

    /// Last known status for an id
    pub fn status(&self, id: &str) -> Option<RecordStatus> {
        self.statuses.get(id).copied()
    }

    /// Terminal status for an id, if it has one
    pub fn terminal(&self, id: &str) -> Option<RecordStatus> {
        self.status(id).filter(RecordStatus::is_terminal)
    }

    /// Register an id seen on a live handle
    ///
    /// Returns the cached status to show right away. An id the cache has never
    /// heard of joins the discovery set.
    pub fn observe(&mut self, id: &str) -> Option<RecordStatus> {
        if let Some(status) = self.status(id) {
            return Some(status);
        }
        if !self.in_flight.contains(id) && !self.retry.contains(id) {
            self.discovered.insert(id.to_string());
        }
        None
    }

    /// Hand out the next lookup batch and mark it in flight
    ///
    /// Always drains the discovery set; drains the retry set too when
    /// `include_retry` is set.
    pub fn take_batch(&mut self, include_retry: bool) -> Vec<String> {
        let mut batch: Vec<String> = std::mem::take(&mut self.discovered).into_iter().collect();
        if include_retry {
            batch.extend(std::mem::take(&mut self.retry));
            batch.sort();
            batch.dedup();
        }
        batch.retain(|id| !self.in_flight.contains(id));
        self.in_flight.extend(batch.iter().cloned());
        batch
    }

    /// Fold a lookup answer into the cache
    ///
    /// Ids missing from `results` count as unknown. Returns the status each
    /// queried id now has in the cache, which is the cached terminal value
    /// when the answer would have downgraded it.
    pub fn resolve(
        &mut self,
        queried: &[String],
        results: &HashMap<String, RecordStatus>,
    ) -> Vec<(String, RecordStatus)> {
        let mut resolved = Vec::with_capacity(queried.len());
        for id in queried {
            self.in_flight.remove(id);
            let answer = results.get(id).copied().unwrap_or(RecordStatus::Unknown);
            self.store(id.clone(), answer);

            let current = self.status(id).unwrap_or(answer);
            if current.is_terminal() {
                self.retry.remove(id);
            } else {
                self.retry.insert(id.clone());
            }
            resolved.push((id.clone(), current));
        }
        resolved
    }

    /// A lookup failed; queue the ids for the next retry
    pub fn fail(&mut self, queried: &[String]) {
        for id in queried {
            self.in_flight.remove(id);
            if self.terminal(id).is_none() {
                self.retry.insert(id.clone());
            }
        }
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    pub fn retry_ids(&self) -> impl Iterator<Item = &str> {
        self.retry.iter().map(String::as_str)
    }

    pub fn discovered_len(&self) -> usize {
        self.discovered.len()
    }

    pub fn retry_len(&self) -> usize {
        self.retry.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of ids with a cached status
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Record a status unless it would replace a terminal one; true if stored
    fn store(&mut self, id: String, status: RecordStatus) -> bool {
        match self.statuses.get(&id) {
            Some(existing) if existing.is_terminal() => false,
            _ => {
                self.statuses.insert(id, status);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn answers(pairs: &[(&str, RecordStatus)]) -> HashMap<String, RecordStatus> {
        pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_observe_unknown_id_queues_discovery_once() {
        let mut cache = SyncCache::new();
        assert_eq!(cache.observe("1"), None);
        assert_eq!(cache.observe("1"), None);
        assert_eq!(cache.discovered_len(), 1);
    }

    #[test]
    fn test_batch_marks_in_flight() {
        let mut cache = SyncCache::new();
        cache.observe("2");
        cache.observe("1");

        let batch = cache.take_batch(false);
        assert_eq!(batch, ids(&["1", "2"]));
        assert!(cache.is_in_flight("1"));

        // seen again while in flight: not rediscovered
        cache.observe("1");
        assert_eq!(cache.discovered_len(), 0);
        assert!(cache.take_batch(true).is_empty());
    }

    #[test]
    fn test_resolve_terminal_and_pending() {
        let mut cache = SyncCache::new();
        for id in ["1", "2", "3"] {
            cache.observe(id);
        }
        let batch = cache.take_batch(false);
        let resolved = cache.resolve(
            &batch,
            &answers(&[("1", RecordStatus::Approved), ("2", RecordStatus::Pending)]),
        );

        assert_eq!(
            resolved,
            vec![
                ("1".to_string(), RecordStatus::Approved),
                ("2".to_string(), RecordStatus::Pending),
                ("3".to_string(), RecordStatus::Unknown),
            ]
        );
        assert_eq!(cache.retry_ids().collect::<Vec<_>>(), vec!["2", "3"]);
        assert_eq!(cache.in_flight_len(), 0);
    }

    #[test]
    fn test_terminal_never_downgraded() {
        let mut cache = SyncCache::new();
        cache.observe("1");
        let batch = cache.take_batch(false);
        cache.resolve(&batch, &answers(&[("1", RecordStatus::Filtered)]));

        let resolved = cache.resolve(&ids(&["1"]), &answers(&[("1", RecordStatus::Pending)]));
        assert_eq!(resolved, vec![("1".to_string(), RecordStatus::Filtered)]);

        let resolved = cache.resolve(&ids(&["1"]), &HashMap::new());
        assert_eq!(resolved, vec![("1".to_string(), RecordStatus::Filtered)]);
        assert_eq!(cache.status("1"), Some(RecordStatus::Filtered));
        assert_eq!(cache.retry_len(), 0);
    }

    #[test]
    fn test_cached_terminal_needs_no_lookup() {
        let mut cache = SyncCache::new();
        cache.bootstrap([("123".to_string(), ClassificationStatus::Approved)].into());

        assert_eq!(cache.observe("123"), Some(RecordStatus::Approved));
        assert!(cache.take_batch(true).is_empty());
    }

    #[test]
    fn test_retry_until_terminal() {
        let mut cache = SyncCache::new();
        cache.observe("1");
        let batch = cache.take_batch(false);
        cache.resolve(&batch, &answers(&[("1", RecordStatus::Pending)]));

        // discovery-only passes leave retries alone
        assert!(cache.take_batch(false).is_empty());
        assert_eq!(cache.observe("1"), Some(RecordStatus::Pending));

        let batch = cache.take_batch(true);
        assert_eq!(batch, ids(&["1"]));
        cache.resolve(&batch, &answers(&[("1", RecordStatus::Approved)]));
        assert_eq!(cache.retry_len(), 0);
        assert_eq!(cache.terminal("1"), Some(RecordStatus::Approved));
    }

    #[test]
    fn test_failure_requeues_without_downgrade() {
        let mut cache = SyncCache::new();
        cache.bootstrap([("1".to_string(), ClassificationStatus::Approved)].into());
        cache.observe("2");
        let mut batch = cache.take_batch(false);
        batch.push("1".to_string());

        cache.fail(&batch);
        assert_eq!(cache.status("1"), Some(RecordStatus::Approved));
        assert_eq!(cache.retry_ids().collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(cache.in_flight_len(), 0);
    }

    #[test]
    fn test_bootstrap_does_not_downgrade() {
        let mut cache = SyncCache::new();
        cache.bootstrap([("1".to_string(), ClassificationStatus::Filtered)].into());
        let seeded = cache.bootstrap([("1".to_string(), ClassificationStatus::Approved)].into());
        assert_eq!(seeded, 0);
        assert_eq!(cache.status("1"), Some(RecordStatus::Filtered));
    }
}
