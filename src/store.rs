//! Unified Record Store
//!
//! Holds every canonical record ingested so far. Readers take an immutable
//! [`StoreSnapshot`] through `ArcSwap` without locking; writers serialise on
//! a mutex and publish a whole new snapshot, so a batch is either fully
//! visible or not at all. Records are never edited in place: a re-uploaded
//! source is removed and added again.

use crate::ingest::FileReport;
use crate::models::{CanonicalRecord, SourceType};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// One ingested source as seen by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub name: String,
    pub source_type: Option<SourceType>,
    pub records: usize,
    pub owners: usize,
    /// SHA-256 of the uploaded bytes, when known.
    pub digest: Option<String>,
}

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    records: Vec<CanonicalRecord>,
    sources: Vec<SourceSummary>,
}

impl StoreSnapshot {
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    /// Sources in first-insertion order.
    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn remove_source(&mut self, name: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.source_name() != name);
        self.sources.retain(|s| s.name != name);
        before - self.records.len()
    }

    fn append(&mut self, records: Vec<CanonicalRecord>, digest: Option<&str>) {
        for record in &records {
            if let Some(summary) = self.sources.iter_mut().find(|s| s.name == record.source_name()) {
                if digest.is_some() {
                    summary.digest = digest.map(str::to_string);
                }
                continue;
            }
            self.sources.push(SourceSummary {
                name: record.source_name().to_string(),
                source_type: Some(record.source_type()),
                records: 0,
                owners: 0,
                digest: digest.map(str::to_string),
            });
        }
        self.records.extend(records);
        self.refresh_counts();
    }

    fn refresh_counts(&mut self) {
        for summary in &mut self.sources {
            let mut owners = HashSet::new();
            let mut count = 0;
            for record in self.records.iter().filter(|r| r.source_name() == summary.name) {
                owners.insert(record.entry_owner());
                count += 1;
            }
            summary.records = count;
            summary.owners = owners.len();
        }
    }

    fn digest_of(&self, name: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.digest.as_deref())
    }
}

/// Outcome of committing an ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub added: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub records: usize,
}

/// Accumulated canonical records from every source.
#[derive(Debug)]
pub struct RecordStore {
    current: ArcSwap<StoreSnapshot>,
    write_lock: Mutex<()>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(StoreSnapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Current contents. Cheap; never blocks writers.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    pub fn sources(&self) -> Vec<SourceSummary> {
        self.current.load().sources.clone()
    }

    /// Append the records of one parsed source.
    pub fn append(&self, records: Vec<CanonicalRecord>) {
        if records.is_empty() {
            return;
        }
        self.update(|state| state.append(records, None));
    }

    /// Drop every record whose source name matches. Returns how many went.
    pub fn remove_source(&self, name: &str) -> usize {
        let removed = self.update(|state| state.remove_source(name));
        info!(source = %name, removed, "Removed source");
        removed
    }

    /// Swap a source's records for a fresh parse of it.
    pub fn replace_source(&self, name: &str, records: Vec<CanonicalRecord>, digest: Option<&str>) {
        self.update(|state| {
            state.remove_source(name);
            state.append(records, digest);
        });
    }

    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.current.store(Arc::new(StoreSnapshot::default()));
        info!("Cleared all records");
    }

    /// Apply a whole ingestion batch in one write.
    ///
    /// Successful files replace any earlier upload with the same name unless
    /// the bytes are identical. Failed files leave earlier data untouched.
    pub fn commit_batch(&self, reports: Vec<FileReport>) -> CommitSummary {
        let summary = self.update(|state| {
            let mut summary = CommitSummary::default();
            for report in reports {
                if !report.is_success() {
                    summary.failed += 1;
                    continue;
                }
                if state.digest_of(&report.source_name) == Some(report.digest.as_str()) {
                    debug!(source = %report.source_name, "Source unchanged, keeping existing records");
                    summary.unchanged += 1;
                    continue;
                }
                if state.remove_source(&report.source_name) > 0 {
                    summary.replaced += 1;
                } else {
                    summary.added += 1;
                }
                state.append(report.outcome.records, Some(&report.digest));
            }
            summary.records = state.len();
            summary
        });

        info!(
            added = summary.added,
            replaced = summary.replaced,
            unchanged = summary.unchanged,
            failed = summary.failed,
            records = summary.records,
            "Committed ingestion batch"
        );
        summary
    }

    fn update<R>(&self, apply: impl FnOnce(&mut StoreSnapshot) -> R) -> R {
        let _guard = self.write_lock.lock();
        let mut next = StoreSnapshot::clone(&self.current.load());
        let result = apply(&mut next);
        self.current.store(Arc::new(next));
        result
    }
}
