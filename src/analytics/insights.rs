//! Outlier observations.
//!
//! Looks at each instance across owners and reports two things: instances
//! only some owners could solve, and instances where the spread between the
//! best and worst score is unusually wide.
//!
//! Observations are reported in the order instances first appear in the
//! snapshot and the list is cut at `max_observations`; it is not ranked by
//! severity.

use crate::config::InsightConfig;
use crate::models::CanonicalRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One human-readable finding about an instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub instance: String,
    pub text: String,
    pub kind: ObservationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservationKind {
    /// Some owners solved the instance and some did not.
    MixedOutcome {
        solved_by: Vec<String>,
        unsolved_by: Vec<String>,
    },
    /// Every owner solved it but the scores are far apart.
    ScoreGap {
        best_owner: String,
        best: f64,
        worst_owner: String,
        worst: f64,
        /// `(worst - best) / best`; infinite when only the best is zero.
        relative_gap: f64,
    },
}

/// Relative gap between best and worst, with zero-best special cases.
pub fn relative_gap(best: f64, worst: f64) -> f64 {
    if best == 0.0 {
        if worst > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        (worst - best) / best
    }
}

/// Owners present in the snapshot, in first-seen order.
pub fn all_owners(records: &[CanonicalRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(CanonicalRecord::entry_owner)
        .filter(|owner| seen.insert(*owner))
        .map(str::to_string)
        .collect()
}

/// Per-instance view: each owner's latest record, in first-seen order.
struct InstanceGroup<'a> {
    instance: &'a str,
    owners: Vec<(&'a str, Option<f64>)>,
}

fn group_by_instance<'a>(
    records: &'a [CanonicalRecord],
    owners: &HashSet<&str>,
) -> Vec<InstanceGroup<'a>> {
    let mut groups: Vec<InstanceGroup<'a>> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for record in records {
        if !owners.contains(record.entry_owner()) {
            continue;
        }
        let idx = *index.entry(record.instance()).or_insert_with(|| {
            groups.push(InstanceGroup {
                instance: record.instance(),
                owners: Vec::new(),
            });
            groups.len() - 1
        });

        let entries = &mut groups[idx].owners;
        // A later record for the same (instance, owner) replaces the earlier one.
        match entries.iter_mut().find(|(o, _)| *o == record.entry_owner()) {
            Some(entry) => entry.1 = record.score(),
            None => entries.push((record.entry_owner(), record.score())),
        }
    }
    groups
}

/// Find notable instances among the given owners' records.
///
/// Records of owners not listed in `owners` are ignored, so a caller can
/// restrict the analysis to the owners currently on display.
pub fn find_outliers(
    records: &[CanonicalRecord],
    owners: &[String],
    config: &InsightConfig,
) -> Vec<Observation> {
    let visible: HashSet<&str> = owners.iter().map(String::as_str).collect();
    let mut observations = Vec::new();

    for group in group_by_instance(records, &visible) {
        if observations.len() >= config.max_observations {
            break;
        }
        if group.owners.len() < 2 {
            continue;
        }

        let (solved, unsolved): (Vec<_>, Vec<_>) =
            group.owners.iter().partition(|(_, score)| score.is_some());

        if !solved.is_empty() && !unsolved.is_empty() {
            let solved_by: Vec<String> = solved.iter().map(|(o, _)| o.to_string()).collect();
            let unsolved_by: Vec<String> = unsolved.iter().map(|(o, _)| o.to_string()).collect();
            observations.push(Observation {
                instance: group.instance.to_string(),
                text: format!(
                    "{}: solved by {} but unsolved by {}",
                    group.instance,
                    solved_by.join(", "),
                    unsolved_by.join(", ")
                ),
                kind: ObservationKind::MixedOutcome {
                    solved_by,
                    unsolved_by,
                },
            });
            continue;
        }

        if solved.len() < 2 {
            continue;
        }
        let scored: Vec<(&str, f64)> = solved
            .iter()
            .filter_map(|(o, s)| s.map(|s| (*o, s)))
            .collect();
        let Some(&(best_owner, best)) = scored.iter().min_by(|a, b| a.1.total_cmp(&b.1)) else {
            continue;
        };
        let Some(&(worst_owner, worst)) = scored.iter().max_by(|a, b| a.1.total_cmp(&b.1)) else {
            continue;
        };

        let gap = relative_gap(best, worst);
        let notable = gap > config.gap_threshold
            || (best == 0.0 && worst > config.zero_best_threshold);
        if !notable {
            continue;
        }

        let spread = if gap.is_finite() {
            format!("{:.1}% gap", gap * 100.0)
        } else {
            "unbounded gap".to_string()
        };
        observations.push(Observation {
            instance: group.instance.to_string(),
            text: format!(
                "{}: {} between best ({} {:.2}) and worst ({} {:.2})",
                group.instance, spread, best_owner, best, worst_owner, worst
            ),
            kind: ObservationKind::ScoreGap {
                best_owner: best_owner.to_string(),
                best,
                worst_owner: worst_owner.to_string(),
                worst,
                relative_gap: gap,
            },
        });
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    fn run(records: &[CanonicalRecord]) -> Vec<Observation> {
        find_outliers(records, &all_owners(records), &InsightConfig::default())
    }

    #[test]
    fn test_mixed_outcome_takes_priority() {
        let records = vec![
            record("A", "50_5_1.vrp", Some(10.0)),
            record("B", "50_5_1.vrp", None),
        ];
        let observations = run(&records);

        assert_eq!(observations.len(), 1);
        assert_eq!(
            observations[0].kind,
            ObservationKind::MixedOutcome {
                solved_by: vec!["A".into()],
                unsolved_by: vec!["B".into()],
            }
        );
        assert_eq!(
            observations[0].text,
            "50_5_1.vrp: solved by A but unsolved by B"
        );
    }

    #[test]
    fn test_mixed_outcome_skips_gap_check() {
        let records = vec![
            record("A", "x_1.vrp", Some(10.0)),
            record("B", "x_1.vrp", Some(100.0)),
            record("C", "x_1.vrp", None),
        ];
        let observations = run(&records);
        assert_eq!(observations.len(), 1);
        assert!(matches!(
            observations[0].kind,
            ObservationKind::MixedOutcome { .. }
        ));
    }

    #[test]
    fn test_single_owner_is_skipped() {
        let records = vec![
            record("A", "x_1.vrp", Some(10.0)),
            record("A", "x_2.vrp", None),
        ];
        assert!(run(&records).is_empty());
    }

    #[test]
    fn test_all_unsolved_is_not_reported() {
        let records = vec![record("A", "x_1.vrp", None), record("B", "x_1.vrp", None)];
        assert!(run(&records).is_empty());
    }

    #[test]
    fn test_score_gap_threshold() {
        let records = vec![
            record("A", "wide_1.vrp", Some(100.0)),
            record("B", "wide_1.vrp", Some(130.0)),
            record("A", "tight_1.vrp", Some(100.0)),
            record("B", "tight_1.vrp", Some(119.0)),
        ];
        let observations = run(&records);

        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].instance, "wide_1.vrp");
        match &observations[0].kind {
            ObservationKind::ScoreGap {
                best_owner,
                worst_owner,
                relative_gap,
                ..
            } => {
                assert_eq!(best_owner, "A");
                assert_eq!(worst_owner, "B");
                assert!((relative_gap - 0.3).abs() < 1e-9);
            }
            other => panic!("Expected ScoreGap, got {:?}", other),
        }
        assert!(observations[0].text.contains("30.0% gap"));
    }

    #[test]
    fn test_zero_best_rules() {
        assert_eq!(relative_gap(0.0, 5.0), f64::INFINITY);
        assert_eq!(relative_gap(0.0, 0.0), 0.0);

        let records = vec![
            record("A", "z_1.vrp", Some(0.0)),
            record("B", "z_1.vrp", Some(0.0)),
            record("A", "z_2.vrp", Some(0.0)),
            record("B", "z_2.vrp", Some(11.0)),
        ];
        let observations = run(&records);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].instance, "z_2.vrp");
        assert!(observations[0].text.contains("unbounded gap"));
    }

    #[test]
    fn test_last_record_wins_per_owner() {
        let records = vec![
            record("A", "x_1.vrp", None),
            record("B", "x_1.vrp", Some(10.0)),
            record("A", "x_1.vrp", Some(10.0)),
        ];
        assert!(run(&records).is_empty());
    }

    #[test]
    fn test_truncated_in_discovery_order() {
        let mut records = Vec::new();
        for i in 0..8 {
            let instance = format!("inst_{}.vrp", i);
            records.push(record("A", &instance, Some(1.0)));
            records.push(record("B", &instance, None));
        }
        let observations = run(&records);
        assert_eq!(observations.len(), 5);
        let instances: Vec<&str> = observations.iter().map(|o| o.instance.as_str()).collect();
        assert_eq!(
            instances,
            ["inst_0.vrp", "inst_1.vrp", "inst_2.vrp", "inst_3.vrp", "inst_4.vrp"]
        );
    }

    #[test]
    fn test_owner_filter() {
        let records = vec![
            record("A", "x_1.vrp", Some(10.0)),
            record("B", "x_1.vrp", None),
            record("C", "x_1.vrp", Some(10.0)),
        ];
        let observations = find_outliers(
            &records,
            &["A".to_string(), "C".to_string()],
            &InsightConfig::default(),
        );
        assert!(observations.is_empty());
    }
}
