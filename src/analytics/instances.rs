//! Per-instance views: who holds the best score on each instance, and how
//! each owner's scores spread across problem sizes.

use super::metrics::instance_best_scores;
use crate::models::CanonicalRecord;
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Best known result for one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceBest {
    pub instance: String,
    pub base_instance_name: String,
    pub num_customers: Option<u32>,
    pub num_vehicles: Option<u32>,
    pub problem_variant: Option<String>,
    /// `None` when nobody solved it.
    pub best_score: Option<f64>,
    /// Every owner at the best score, in first-seen order.
    pub best_owners: Vec<String>,
    /// Distinct owners with a record for this instance.
    pub attempted: usize,
    /// Distinct owners with a score for this instance.
    pub solved: usize,
}

/// Best score and holders for every instance in the snapshot.
///
/// Sized instances come first, by customers, vehicles, variant and name;
/// instances without a decoded size follow, by name.
pub fn best_per_instance(records: &[CanonicalRecord]) -> Vec<InstanceBest> {
    let best = instance_best_scores(records);
    let mut rows: Vec<InstanceBest> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut attempted: Vec<Vec<&str>> = Vec::new();
    let mut solved: Vec<Vec<&str>> = Vec::new();

    for record in records {
        let idx = *index.entry(record.instance()).or_insert_with(|| {
            rows.push(InstanceBest {
                instance: record.instance().to_string(),
                base_instance_name: record.base_instance_name().to_string(),
                num_customers: record.num_customers(),
                num_vehicles: record.num_vehicles(),
                problem_variant: record.problem_variant().map(str::to_string),
                best_score: best.get(record.instance()).copied(),
                best_owners: Vec::new(),
                attempted: 0,
                solved: 0,
            });
            attempted.push(Vec::new());
            solved.push(Vec::new());
            rows.len() - 1
        });

        let owner = record.entry_owner();
        if !attempted[idx].contains(&owner) {
            attempted[idx].push(owner);
        }
        let Some(score) = record.score() else {
            continue;
        };
        if !solved[idx].contains(&owner) {
            solved[idx].push(owner);
        }
        let row = &mut rows[idx];
        if row.best_score == Some(score) && !row.best_owners.iter().any(|o| o == owner) {
            row.best_owners.push(owner.to_string());
        }
    }

    for (idx, row) in rows.iter_mut().enumerate() {
        row.attempted = attempted[idx].len();
        row.solved = solved[idx].len();
    }
    rows.sort_by(compare_instances);
    rows
}

fn compare_instances(a: &InstanceBest, b: &InstanceBest) -> Ordering {
    match (a.num_customers, b.num_customers) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => a
            .num_customers
            .cmp(&b.num_customers)
            .then_with(|| a.num_vehicles.cmp(&b.num_vehicles))
            .then_with(|| a.problem_variant.cmp(&b.problem_variant))
            .then_with(|| a.instance.cmp(&b.instance)),
    }
}

/// Spread of one owner's solved scores at one problem size.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeDistribution {
    pub num_customers: u32,
    pub owner: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` below two scores.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Score distribution per (problem size, owner), ordered by size then owner.
pub fn size_distribution(records: &[CanonicalRecord]) -> Vec<SizeDistribution> {
    let mut groups: BTreeMap<(u32, &str), Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(customers), Some(score)) = (record.num_customers(), record.score()) {
            groups
                .entry((customers, record.entry_owner()))
                .or_default()
                .push(score);
        }
    }

    groups
        .into_iter()
        .map(|((num_customers, owner), scores)| {
            let std_dev = Statistics::std_dev(scores.iter());
            let mean = Statistics::mean(scores.iter());
            let min = Statistics::min(scores.iter());
            let max = Statistics::max(scores.iter());
            let count = scores.len();
            let median = Data::new(scores).median();
            SizeDistribution {
                num_customers,
                owner: owner.to_string(),
                count,
                mean,
                median,
                std_dev: Some(std_dev).filter(|s| s.is_finite()),
                min,
                max,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    #[test]
    fn test_best_per_instance_with_ties() {
        let records = vec![
            record("a", "50_5_1.vrp", Some(10.0)),
            record("b", "50_5_1.vrp", Some(10.0)),
            record("c", "50_5_1.vrp", None),
            record("a", "50_5_1.vrp", Some(10.0)),
        ];
        let rows = best_per_instance(&records);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.best_score, Some(10.0));
        assert_eq!(row.best_owners, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(row.attempted, 3);
        assert_eq!(row.solved, 2);
        assert_eq!(row.base_instance_name, "50_5");
    }

    #[test]
    fn test_unsolved_instance_has_no_best() {
        let rows = best_per_instance(&[record("a", "x_1.vrp", None)]);
        assert_eq!(rows[0].best_score, None);
        assert!(rows[0].best_owners.is_empty());
        assert_eq!(rows[0].solved, 0);
    }

    #[test]
    fn test_instance_ordering() {
        let records = vec![
            record("a", "named_b.vrp", Some(1.0)),
            record("a", "100_8_1.vrp", Some(1.0)),
            record("a", "50_5_2.vrp", Some(1.0)),
            record("a", "50_5_1.vrp", Some(1.0)),
            record("a", "named_a.vrp", Some(1.0)),
            record("a", "50_4_9.vrp", Some(1.0)),
        ];
        let order: Vec<String> = best_per_instance(&records)
            .into_iter()
            .map(|r| r.instance)
            .collect();
        assert_eq!(
            order,
            [
                "50_4_9.vrp",
                "50_5_1.vrp",
                "50_5_2.vrp",
                "100_8_1.vrp",
                "named_a.vrp",
                "named_b.vrp"
            ]
        );
    }

    #[test]
    fn test_size_distribution() {
        let records = vec![
            record("a", "50_5_1.vrp", Some(10.0)),
            record("a", "50_5_2.vrp", Some(20.0)),
            record("a", "50_5_3.vrp", Some(60.0)),
            record("a", "50_5_4.vrp", None),
            record("b", "50_5_1.vrp", Some(12.0)),
            record("a", "100_8_1.vrp", Some(99.0)),
            record("a", "named_x.vrp", Some(5.0)),
        ];
        let dist = size_distribution(&records);
        assert_eq!(dist.len(), 3);

        let a50 = &dist[0];
        assert_eq!((a50.num_customers, a50.owner.as_str()), (50, "a"));
        assert_eq!(a50.count, 3);
        assert!((a50.mean - 30.0).abs() < 1e-9);
        assert!((a50.median - 20.0).abs() < 1e-9);
        assert_eq!(a50.min, 10.0);
        assert_eq!(a50.max, 60.0);
        assert!((a50.std_dev.unwrap() - 700.0_f64.sqrt()).abs() < 1e-9);

        let b50 = &dist[1];
        assert_eq!(b50.owner, "b");
        assert_eq!(b50.std_dev, None);

        assert_eq!(dist[2].num_customers, 100);
    }
}
