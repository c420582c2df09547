//! Per-owner Metrics
//!
//! Rebuilt from the full record snapshot on every call. The computation is
//! two passes because `best_solutions` compares each score against the
//! global best for its instance, which is only known once every record has
//! been seen.

use crate::models::CanonicalRecord;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Summed solved scores for one problem size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeBucket {
    pub summed_score: f64,
    pub count: usize,
}

impl SizeBucket {
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.summed_score / self.count as f64)
    }
}

/// Aggregate results of one owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerMetrics {
    pub total_score: f64,
    /// `None` when nothing was solved: no ranking is possible.
    pub avg_score: Option<f64>,
    pub solved_count: usize,
    /// Records for this owner, solved or not.
    pub total_problems: usize,
    /// Instances where this owner holds or ties the global best score.
    pub best_solutions: usize,
    /// Keyed by customer count; records without a size are left out.
    pub by_size: BTreeMap<u32, SizeBucket>,
}

impl OwnerMetrics {
    /// Average as a sort key, with unsolved owners at `+inf`.
    pub fn avg_score_or_inf(&self) -> f64 {
        self.avg_score.unwrap_or(f64::INFINITY)
    }

    pub fn unsolved_count(&self) -> usize {
        self.total_problems - self.solved_count
    }
}

/// Lowest (best) solved score per instance.
pub fn instance_best_scores(records: &[CanonicalRecord]) -> HashMap<&str, f64> {
    let mut best: HashMap<&str, f64> = HashMap::new();
    for record in records {
        if let Some(score) = record.score() {
            best.entry(record.instance())
                .and_modify(|b| *b = b.min(score))
                .or_insert(score);
        }
    }
    best
}

/// Compute metrics for every owner in the snapshot.
pub fn compute(records: &[CanonicalRecord]) -> BTreeMap<String, OwnerMetrics> {
    let mut metrics: BTreeMap<String, OwnerMetrics> = BTreeMap::new();

    // Pass 1: per-owner totals.
    for record in records {
        let owner = metrics.entry(record.entry_owner().to_string()).or_default();
        owner.total_problems += 1;

        let Some(score) = record.score() else {
            continue;
        };
        owner.total_score += score;
        owner.solved_count += 1;
        if let Some(customers) = record.num_customers() {
            let bucket = owner.by_size.entry(customers).or_default();
            bucket.summed_score += score;
            bucket.count += 1;
        }
    }
    let best = instance_best_scores(records);

    // Pass 2: averages and best-solution credit. Ties credit every owner.
    for owner in metrics.values_mut() {
        owner.avg_score =
            (owner.solved_count > 0).then(|| owner.total_score / owner.solved_count as f64);
    }
    for record in records {
        let Some(score) = record.score() else {
            continue;
        };
        if best.get(record.instance()) == Some(&score) {
            if let Some(owner) = metrics.get_mut(record.entry_owner()) {
                owner.best_solutions += 1;
            }
        }
    }

    metrics
}

/// Owner position in the overall standings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRanking {
    /// 1-based; `None` for owners that solved nothing.
    pub rank: Option<usize>,
    pub owner: String,
    pub avg_score: Option<f64>,
    pub solved_count: usize,
    pub total_problems: usize,
    pub best_solutions: usize,
}

/// Standings order: lower average first, then more solved, then name.
/// Owners without an average always sort after owners with one.
pub fn compare_owners(a: (&str, &OwnerMetrics), b: (&str, &OwnerMetrics)) -> Ordering {
    match (a.1.avg_score, b.1.avg_score) {
        (Some(x), Some(y)) => x
            .total_cmp(&y)
            .then_with(|| b.1.solved_count.cmp(&a.1.solved_count))
            .then_with(|| a.0.cmp(b.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(b.0),
    }
}

/// Rank owners by [`compare_owners`].
pub fn rank_owners(metrics: &BTreeMap<String, OwnerMetrics>) -> Vec<OwnerRanking> {
    let mut owners: Vec<(&str, &OwnerMetrics)> =
        metrics.iter().map(|(name, m)| (name.as_str(), m)).collect();
    owners.sort_by(|a, b| compare_owners(*a, *b));

    owners
        .into_iter()
        .enumerate()
        .map(|(idx, (owner, m))| OwnerRanking {
            rank: m.avg_score.map(|_| idx + 1),
            owner: owner.to_string(),
            avg_score: m.avg_score,
            solved_count: m.solved_count,
            total_problems: m.total_problems,
            best_solutions: m.best_solutions,
        })
        .collect()
}
