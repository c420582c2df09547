//! Serializable analytics report handed to the presentation layer.

use crate::analytics::{
    all_owners, best_per_instance, compute, find_outliers, rank_owners, size_distribution,
    InstanceBest, Observation, OwnerMetrics, OwnerRanking, SizeDistribution,
};
use crate::config::InsightConfig;
use crate::store::{SourceSummary, StoreSnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub unsolved_records: usize,
    pub sources: Vec<SourceSummary>,
    pub owners: BTreeMap<String, OwnerMetrics>,
    pub ranking: Vec<OwnerRanking>,
    pub instances: Vec<InstanceBest>,
    pub size_distribution: Vec<SizeDistribution>,
    pub observations: Vec<Observation>,
}

impl AnalyticsReport {
    /// Run every analytics pass over one snapshot.
    pub fn build(snapshot: &StoreSnapshot, insights: &InsightConfig) -> Self {
        let records = snapshot.records();
        let owners = compute(records);
        let ranking = rank_owners(&owners);

        Self {
            generated_at: Utc::now(),
            total_records: records.len(),
            unsolved_records: records.iter().filter(|r| r.is_unsolved()).count(),
            sources: snapshot.sources().to_vec(),
            instances: best_per_instance(records),
            size_distribution: size_distribution(records),
            observations: find_outliers(records, &all_owners(records), insights),
            owners,
            ranking,
        }
    }

    /// Write as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }
}
