//! Canonical result records shared by every parser and analytics pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Leaderboard,
    Log,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Leaderboard => "leaderboard",
            SourceType::Log => "log",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-unique record identifier. Not stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Size and variant metadata decoded from an instance file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstanceName {
    pub num_customers: Option<u32>,
    pub num_vehicles: Option<u32>,
    pub problem_variant: Option<String>,
    /// Never empty.
    pub base_instance_name: String,
}

/// One (owner, instance) result in source-agnostic form.
///
/// Records are immutable once built. The constructor is the only way to
/// produce one, which keeps `is_unsolved` in lockstep with `score`: a record
/// is unsolved exactly when it carries no finite score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    id: RecordId,
    source_name: String,
    entry_owner: String,
    instance: String,
    #[serde(flatten)]
    parsed: ParsedInstanceName,
    score: Option<f64>,
    time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution_string: Option<String>,
    is_unsolved: bool,
    source_type: SourceType,
}

/// Fields needed to build a [`CanonicalRecord`].
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub source_name: String,
    pub entry_owner: String,
    pub instance: String,
    pub parsed: ParsedInstanceName,
    pub score: Option<f64>,
    pub time: Option<f64>,
    pub solution_string: Option<String>,
    pub source_type: SourceType,
}

impl CanonicalRecord {
    /// Build a record with a fresh id. Non-finite scores are stored as
    /// unsolved.
    pub fn new(draft: RecordDraft) -> Self {
        let score = draft.score.filter(|s| s.is_finite());
        Self {
            id: RecordId::new(),
            source_name: draft.source_name,
            entry_owner: draft.entry_owner,
            instance: draft.instance,
            parsed: draft.parsed,
            score,
            time: draft.time.filter(|t| t.is_finite()),
            solution_string: draft.solution_string,
            is_unsolved: score.is_none(),
            source_type: draft.source_type,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn entry_owner(&self) -> &str {
        &self.entry_owner
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn parsed_name(&self) -> &ParsedInstanceName {
        &self.parsed
    }

    pub fn num_customers(&self) -> Option<u32> {
        self.parsed.num_customers
    }

    pub fn num_vehicles(&self) -> Option<u32> {
        self.parsed.num_vehicles
    }

    pub fn problem_variant(&self) -> Option<&str> {
        self.parsed.problem_variant.as_deref()
    }

    pub fn base_instance_name(&self) -> &str {
        &self.parsed.base_instance_name
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn time(&self) -> Option<f64> {
        self.time
    }

    pub fn solution_string(&self) -> Option<&str> {
        self.solution_string.as_deref()
    }

    pub fn is_unsolved(&self) -> bool {
        self.is_unsolved
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::record;

    #[test]
    fn test_unsolved_tracks_score() {
        let solved = record("a", "50_5_1.vrp", Some(12.0));
        assert!(!solved.is_unsolved());
        assert_eq!(solved.score(), Some(12.0));

        let unsolved = record("a", "50_5_1.vrp", None);
        assert!(unsolved.is_unsolved());
        assert_eq!(unsolved.score(), None);
    }

    #[test]
    fn test_non_finite_score_is_unsolved() {
        let rec = record("a", "50_5_1.vrp", Some(f64::NAN));
        assert!(rec.is_unsolved());
        assert_eq!(rec.score(), None);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = record("a", "x.vrp", Some(1.0));
        let b = record("a", "x.vrp", Some(1.0));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_serializes_flattened_camel_case() {
        let rec = record("alice", "101_11_2.vrp", Some(3.5));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["entryOwner"], "alice");
        assert_eq!(json["numCustomers"], 101);
        assert_eq!(json["baseInstanceName"], "101_11");
        assert_eq!(json["isUnsolved"], false);
        assert_eq!(json["sourceType"], "leaderboard");
        assert!(json.get("solutionString").is_none());
    }
}
