//! JSON-lines solver logs.
//!
//! One file is one solver run: every line is an object with `Instance`,
//! `Time`, `Result` and `Solution`, and the owner of every record is the file
//! name. `"--"` in `Time` or `Result` marks an instance the solver gave up on.

use super::{instance_name, Diagnostic, ParseOutcome};
use crate::models::{CanonicalRecord, RecordDraft, SourceType};
use serde::Deserialize;
use tracing::warn;

/// Marker written by the solver harness for a missing value.
pub const UNSOLVED_MARKER: &str = "--";

/// Raw log line as written by the solver harness.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLogLine {
    #[serde(rename = "Instance")]
    pub instance: String,
    #[serde(rename = "Time")]
    pub time: LogValue,
    #[serde(rename = "Result")]
    pub result: LogValue,
    #[serde(rename = "Solution", default)]
    pub solution: Option<String>,
}

/// Numeric field that harnesses emit either quoted or bare.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Number(f64),
    Text(String),
}

impl LogValue {
    fn is_unsolved_marker(&self) -> bool {
        matches!(self, LogValue::Text(s) if s.trim() == UNSOLVED_MARKER)
    }

    fn to_f64(&self, field: &str) -> Result<f64, String> {
        let value = match self {
            LogValue::Number(n) => *n,
            LogValue::Text(s) => fast_float::parse::<f64, _>(s.trim())
                .map_err(|_| format!("{} is not a number: {:?}", field, s))?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("{} is not finite", field))
        }
    }
}

/// Parse a whole log file. Bad lines are skipped and reported, never fatal.
pub fn parse(content: &str, source_file_name: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line, source_file_name) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                warn!(
                    source = %source_file_name,
                    line = idx + 1,
                    %reason,
                    "Skipping malformed log line"
                );
                outcome.diagnostics.push(Diagnostic::MalformedLine {
                    line: idx + 1,
                    reason,
                });
            }
        }
    }

    outcome
}

fn parse_line(line: &str, source_file_name: &str) -> Result<CanonicalRecord, String> {
    let raw: RawLogLine = serde_json::from_str(line).map_err(|e| e.to_string())?;

    let unsolved = raw.result.is_unsolved_marker() || raw.time.is_unsolved_marker();
    let (score, time) = if unsolved {
        (None, None)
    } else {
        (
            Some(raw.result.to_f64("Result")?),
            Some(raw.time.to_f64("Time")?),
        )
    };

    Ok(CanonicalRecord::new(RecordDraft {
        source_name: source_file_name.to_string(),
        entry_owner: source_file_name.to_string(),
        parsed: instance_name::parse(&raw.instance),
        instance: raw.instance,
        score,
        time,
        solution_string: raw.solution,
        source_type: SourceType::Log,
    }))
}
