//! Record extraction from captured timeline payloads
//!
//! The payloads are GraphQL responses whose shape drifts between releases, so
//! nothing here assumes a fixed layout. The whole tree is walked, every node the
//! [`CandidatePredicate`] accepts is normalized on its own, and the results are
//! deduplicated by id in traversal order.
//!
//! Traversal is pre-order with an explicit stack: arrays in index order, object
//! fields in map order (`serde_json` keeps keys sorted). Children of a candidate
//! are traversed too, so quoted and retweeted records come out as well.

pub mod chain;
mod normalize;

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::Record;

pub use normalize::normalize;

/// A candidate node that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("candidate has no resolvable id")]
    MissingId,

    #[error("field {path} is not a {expected}")]
    WrongType { path: String, expected: &'static str },
}

/// Decides whether an object node is a record candidate
pub trait CandidatePredicate {
    fn is_candidate(&self, node: &Map<String, Value>) -> bool;
}

/// `__typename == "Tweet"`, or a string `legacy.full_text`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPredicate;

const RECORD_TYPENAMES: &[&str] = &["Tweet"];

impl CandidatePredicate for DefaultPredicate {
    fn is_candidate(&self, node: &Map<String, Value>) -> bool {
        if let Some(Value::String(typename)) = node.get("__typename") {
            if RECORD_TYPENAMES.contains(&typename.as_str()) {
                return true;
            }
        }
        node.get("legacy")
            .and_then(|legacy| legacy.get("full_text"))
            .is_some_and(Value::is_string)
    }
}

impl<F> CandidatePredicate for F
where
    F: Fn(&Map<String, Value>) -> bool,
{
    fn is_candidate(&self, node: &Map<String, Value>) -> bool {
        self(node)
    }
}

/// Counters from one extraction call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub nodes: usize,
    pub candidates: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

/// Walks payloads and normalizes candidates
#[derive(Debug, Clone, Default)]
pub struct Extractor<P = DefaultPredicate> {
    predicate: P,
}

impl Extractor<DefaultPredicate> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: CandidatePredicate> Extractor<P> {
    pub fn with_predicate(predicate: P) -> Self {
        Self { predicate }
    }

    /// Extract deduplicated records from a payload
    pub fn extract(&self, payload: &Value) -> Vec<Record> {
        self.extract_with_report(payload).0
    }

    /// Extract and also report how many candidates were seen, dropped and collapsed
    pub fn extract_with_report(&self, payload: &Value) -> (Vec<Record>, ExtractReport) {
        let mut report = ExtractReport::default();
        let mut records = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack: Vec<&Value> = vec![payload];

        while let Some(node) = stack.pop() {
            report.nodes += 1;
            match node {
                Value::Object(map) => {
                    if self.predicate.is_candidate(map) {
                        report.candidates += 1;
                        match normalize(node) {
                            Ok(record) => {
                                if seen.insert(record.id.clone()) {
                                    records.push(record);
                                } else {
                                    report.duplicates += 1;
                                }
                            }
                            Err(e) => {
                                report.malformed += 1;
                                debug!(error = %e, "Dropping malformed candidate");
                            }
                        }
                    }
                    stack.extend(map.values().rev());
                }
                Value::Array(items) => stack.extend(items.iter().rev()),
                _ => {}
            }
        }

        debug!(
            nodes = report.nodes,
            candidates = report.candidates,
            extracted = records.len(),
            malformed = report.malformed,
            duplicates = report.duplicates,
            "Extraction complete"
        );

        (records, report)
    }
}

/// Extract with the default predicate
pub fn extract(payload: &Value) -> Vec<Record> {
    Extractor::new().extract(payload)
}
