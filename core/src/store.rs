use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::detection::{DetectionRecord, FeedEntry, Severity};
use crate::prelude::RecordError;
use crate::telemetry::LogManager;

/// Entry dropped while loading a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub id: Option<String>,
    #[serde(serialize_with = "as_display")]
    pub reason: RecordError,
}

fn as_display<S>(reason: &RecordError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(reason)
}

/// Outcome of [`DetectionStore::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub accepted: usize,
    pub dropped: usize,
    pub rejections: Vec<Rejection>,
}

/// Holds the read-only batch of detections for one session.
#[derive(Debug, Default)]
pub struct DetectionStore {
    records: Vec<DetectionRecord>,
    index: HashMap<String, usize>,
}

impl DetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the working set. Malformed or invalid entries and repeated
    /// ids are dropped and reported; the first occurrence of an id wins.
    pub fn load<I, E>(&mut self, batch: I) -> LoadReport
    where
        I: IntoIterator<Item = E>,
        E: Into<FeedEntry>,
    {
        let logger = LogManager::new("store");
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut report = LoadReport::default();

        for (index, entry) in batch.into_iter().enumerate() {
            let entry = entry.into();
            let raw_id = entry.id();
            let decoded = match entry {
                FeedEntry::Decoded(raw) => DetectionRecord::try_from(raw),
                FeedEntry::Malformed { reason, .. } => Err(RecordError::Malformed(reason)),
            };
            let outcome = decoded.and_then(|record| {
                if seen.insert(record.id.clone()) {
                    Ok(record)
                } else {
                    Err(RecordError::DuplicateId(record.id))
                }
            });
            match outcome {
                Ok(record) => records.push(record),
                Err(reason) => {
                    logger.warn(&format!("dropping entry {index}: {reason}"));
                    report.rejections.push(Rejection {
                        index,
                        id: raw_id,
                        reason,
                    });
                }
            }
        }

        report.accepted = records.len();
        report.dropped = report.rejections.len();
        self.index = records
            .iter()
            .enumerate()
            .map(|(position, record)| (record.id.clone(), position))
            .collect();
        self.records = records;

        logger.record(&format!(
            "loaded {} detections, dropped {}",
            report.accepted, report.dropped
        ));
        report
    }

    pub fn all(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&DetectionRecord> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-severity tally, indexed by [`Severity::index`].
    pub fn severity_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for record in &self.records {
            counts[record.severity.index()] += 1;
        }
        counts
    }

    pub fn count_of(&self, severity: Severity) -> usize {
        self.severity_counts()[severity.index()]
    }
}
