//! Leaderboard HTML pages.
//!
//! The page embeds its table as JSON inside one carrier element:
//!
//! ```text
//! <script id="leaderboard-data" type="application/json">
//!   {"columns": [{"name": "Rank"}, {"name": "50_5_1.vrp"}, ...],
//!    "entries": [{"name": "team-a", "50_5_1.vrp": "4388.34 [0.21]"}, ...]}
//! </script>
//! ```
//!
//! Every non-bookkeeping column is a problem instance and every row is one
//! participant, so each populated (row, column) cell becomes one record.

use super::{instance_name, Diagnostic, ParseOutcome};
use crate::models::{CanonicalRecord, RecordDraft, SourceType};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Default id of the element holding the JSON payload.
pub const DEFAULT_CARRIER_ID: &str = "leaderboard-data";

/// Owner used for rows without a name.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown Participant";

/// Bookkeeping columns that are never problem instances.
pub const EXCLUDED_COLUMNS: &[&str] = &[
    "Total time",
    "Rank",
    "Submission Name",
    "Avg Time",
    "Submissions",
    "Problems Solved",
    "name",
    "assignment_submission_id",
];

/// Embedded leaderboard document.
///
/// Columns and rows stay loosely typed so one bad element only costs itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardPayload {
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub entries: Vec<Value>,
}

impl LeaderboardPayload {
    /// Names of columns that hold per-instance results, in table order.
    ///
    /// Columns without a string `name` are left out and reported.
    pub fn instance_columns(&self, diagnostics: &mut Vec<Diagnostic>) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.columns.len());
        for (idx, column) in self.columns.iter().enumerate() {
            match column.get("name").and_then(Value::as_str) {
                Some(name) if !EXCLUDED_COLUMNS.contains(&name) => names.push(name),
                Some(_) => {}
                None => diagnostics.push(Diagnostic::MalformedColumn {
                    position: idx + 1,
                    reason: format!("no string `name` in {}", column),
                }),
            }
        }
        names
    }
}

/// Row owner. Non-string names are kept in their JSON form.
fn entry_owner(entry: &Map<String, Value>) -> Cow<'_, str> {
    match entry.get("name") {
        Some(Value::String(name)) if !name.is_empty() => Cow::Borrowed(name.as_str()),
        None | Some(Value::Null) | Some(Value::String(_)) => Cow::Borrowed(UNKNOWN_PARTICIPANT),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What a single cell says about one participant on one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    /// Attempted without a score; the bracketed run time is kept when present.
    Unsolved { time: Option<f64> },
    Solved { score: f64, time: Option<f64> },
    /// Text of no known shape. Stored as unsolved with no time.
    Unrecognized,
}

fn unsolved_with_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--\s*\[([\d.]+)\]$").expect("unsolved cell regex"))
}

fn solved_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([\d.-]+)(?:\s*\[([\d.]+)\])?$").expect("solved cell regex")
    })
}

fn parse_number(text: &str) -> Option<f64> {
    fast_float::parse::<f64, _>(text)
        .ok()
        .filter(|v| v.is_finite())
}

impl CellValue {
    /// Classify a cell's text. Checked in order: unsolved, solved, anything else.
    pub fn parse_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == "--" {
            return CellValue::Unsolved { time: None };
        }
        if let Some(caps) = unsolved_with_time_re().captures(text) {
            return CellValue::Unsolved {
                time: parse_number(&caps[1]),
            };
        }
        if let Some(caps) = solved_re().captures(text) {
            return match parse_number(&caps[1]) {
                Some(score) => CellValue::Solved {
                    score,
                    time: caps.get(2).and_then(|m| parse_number(m.as_str())),
                },
                None => CellValue::Unrecognized,
            };
        }
        CellValue::Unrecognized
    }

    /// Classify a JSON cell. `None` means the cell is empty: not attempted.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::parse_text(s)),
            Value::Number(n) => Some(match n.as_f64().filter(|v| v.is_finite()) {
                Some(score) => CellValue::Solved { score, time: None },
                None => CellValue::Unrecognized,
            }),
            _ => Some(CellValue::Unrecognized),
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            CellValue::Solved { score, .. } => Some(*score),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<f64> {
        match self {
            CellValue::Solved { time, .. } | CellValue::Unsolved { time } => *time,
            CellValue::Unrecognized => None,
        }
    }
}

/// Parse a leaderboard page using the default carrier id.
pub fn parse(html: &str, source_file_name: &str) -> ParseOutcome {
    parse_with_carrier(html, source_file_name, DEFAULT_CARRIER_ID)
}

/// Parse a leaderboard page whose payload lives in the element with `carrier_id`.
pub fn parse_with_carrier(html: &str, source_file_name: &str, carrier_id: &str) -> ParseOutcome {
    let Some(body) = find_carrier_body(html, carrier_id) else {
        warn!(source = %source_file_name, carrier_id, "Leaderboard carrier element not found");
        return ParseOutcome::failed(Diagnostic::MissingCarrier);
    };

    let payload = match decode_payload(body) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(source = %source_file_name, %reason, "Leaderboard payload could not be decoded");
            return ParseOutcome::failed(Diagnostic::MalformedPayload { reason });
        }
    };

    records_from_payload(&payload, source_file_name)
}

/// Expand a decoded payload into one record per populated (row, column) cell.
pub fn records_from_payload(payload: &LeaderboardPayload, source_file_name: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let columns = payload.instance_columns(&mut outcome.diagnostics);
    if !outcome.diagnostics.is_empty() {
        warn!(
            source = %source_file_name,
            skipped = outcome.diagnostics.len(),
            "Skipped leaderboard columns without a name"
        );
    }

    for (idx, entry) in payload.entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            warn!(source = %source_file_name, row = idx + 1, "Skipping leaderboard row that is not an object");
            outcome.diagnostics.push(Diagnostic::MalformedRow {
                row: idx + 1,
                reason: format!("expected an object, found {}", json_kind(entry)),
            });
            continue;
        };
        let owner = entry_owner(entry);

        for &column in &columns {
            let Some(raw) = entry.get(column) else {
                continue;
            };
            let Some(cell) = CellValue::from_json(raw) else {
                continue;
            };

            if cell == CellValue::Unrecognized {
                debug!(source = %source_file_name, owner = %owner, column, cell = %raw, "Unrecognized leaderboard cell");
                outcome.diagnostics.push(Diagnostic::UnrecognizedCell {
                    owner: owner.to_string(),
                    column: column.to_string(),
                    text: raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string()),
                });
            }

            outcome.records.push(CanonicalRecord::new(RecordDraft {
                source_name: source_file_name.to_string(),
                entry_owner: owner.to_string(),
                instance: column.to_string(),
                parsed: instance_name::parse(column),
                score: cell.score(),
                time: cell.time(),
                solution_string: None,
                source_type: SourceType::Leaderboard,
            }));
        }
    }

    outcome
}

/// Text content of the first element whose `id` attribute equals `carrier_id`.
fn find_carrier_body<'a>(html: &'a str, carrier_id: &str) -> Option<&'a str> {
    let pattern = format!(
        r#"(?is)<([a-z][a-z0-9-]*)\b[^>]*?\sid\s*=\s*["']{}["'][^>]*>"#,
        regex::escape(carrier_id)
    );
    let open = Regex::new(&pattern).ok()?;
    let caps = open.captures(html)?;
    let start = caps.get(0)?.end();
    let closing = format!("</{}", caps[1].to_ascii_lowercase());

    let rest = &html[start..];
    let end = rest.to_ascii_lowercase().find(&closing)?;
    Some(&rest[..end])
}

fn decode_payload(body: &str) -> Result<LeaderboardPayload, String> {
    let body = body.trim();
    match serde_json::from_str(body) {
        Ok(payload) => Ok(payload),
        Err(first) if body.contains('&') => {
            serde_json::from_str(&unescape_entities(body)).map_err(|_| first.to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Undo the entity escaping applied when the payload sits in a non-script element.
fn unescape_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(payload: &str) -> String {
        format!(
            "<html><head><title>Board</title></head><body>\
             <div class=\"table\"></div>\
             <script type=\"application/json\" id=\"leaderboard-data\">{}</script>\
             </body></html>",
            payload
        )
    }

    const PAYLOAD: &str = r#"{
        "columns": [{"name": "Rank"}, {"name": "name"}, {"name": "50_5_1.vrp"},
                    {"name": "50_5_2.vrp"}, {"name": "Total time"}],
        "entries": [
            {"name": "alpha", "Rank": 1, "50_5_1.vrp": "4388.34 [0.21]", "50_5_2.vrp": "--",
             "Total time": "12.0"},
            {"name": "beta", "Rank": 2, "50_5_1.vrp": "-- [5.0]", "50_5_2.vrp": null},
            {"Rank": 3, "50_5_1.vrp": 4400}
        ]
    }"#;

    #[test]
    fn test_cell_text_shapes() {
        assert_eq!(
            CellValue::parse_text("4388.34 [0.21]"),
            CellValue::Solved {
                score: 4388.34,
                time: Some(0.21)
            }
        );
        assert_eq!(
            CellValue::parse_text("--"),
            CellValue::Unsolved { time: None }
        );
        assert_eq!(
            CellValue::parse_text("-- [5.0]"),
            CellValue::Unsolved { time: Some(5.0) }
        );
        assert_eq!(CellValue::parse_text(""), CellValue::Unsolved { time: None });
        assert_eq!(
            CellValue::parse_text("812"),
            CellValue::Solved {
                score: 812.0,
                time: None
            }
        );
        assert_eq!(
            CellValue::parse_text("-3.5[1]"),
            CellValue::Solved {
                score: -3.5,
                time: Some(1.0)
            }
        );
    }

    #[test]
    fn test_unrecognized_cell_text() {
        assert_eq!(CellValue::parse_text("timeout"), CellValue::Unrecognized);
        assert_eq!(CellValue::parse_text("1.2.3"), CellValue::Unrecognized);
        assert_eq!(CellValue::parse_text("5-3"), CellValue::Unrecognized);
        assert_eq!(CellValue::parse_text("-"), CellValue::Unrecognized);
        assert_eq!(CellValue::parse_text("12 [fast]"), CellValue::Unrecognized);
    }

    #[test]
    fn test_json_cell_kinds() {
        assert_eq!(CellValue::from_json(&Value::Null), None);
        assert_eq!(
            CellValue::from_json(&serde_json::json!(10.5)),
            Some(CellValue::Solved {
                score: 10.5,
                time: None
            })
        );
        assert_eq!(
            CellValue::from_json(&serde_json::json!(true)),
            Some(CellValue::Unrecognized)
        );
    }

    #[test]
    fn test_parse_page() {
        let outcome = parse(&page(PAYLOAD), "board.html");

        // alpha: 2 cells, beta: 1 (null skipped), unnamed row: 1.
        assert_eq!(outcome.records.len(), 4);
        assert!(outcome.diagnostics.is_empty());

        let alpha_1 = &outcome.records[0];
        assert_eq!(alpha_1.entry_owner(), "alpha");
        assert_eq!(alpha_1.instance(), "50_5_1.vrp");
        assert_eq!(alpha_1.score(), Some(4388.34));
        assert_eq!(alpha_1.time(), Some(0.21));
        assert_eq!(alpha_1.num_customers(), Some(50));
        assert_eq!(alpha_1.source_type(), SourceType::Leaderboard);
        assert_eq!(alpha_1.source_name(), "board.html");
        assert_eq!(alpha_1.solution_string(), None);

        let alpha_2 = &outcome.records[1];
        assert!(alpha_2.is_unsolved());
        assert_eq!(alpha_2.time(), None);

        let beta = &outcome.records[2];
        assert_eq!(beta.entry_owner(), "beta");
        assert!(beta.is_unsolved());
        assert_eq!(beta.time(), Some(5.0));

        let unnamed = &outcome.records[3];
        assert_eq!(unnamed.entry_owner(), UNKNOWN_PARTICIPANT);
        assert_eq!(unnamed.score(), Some(4400.0));
    }

    #[test]
    fn test_excluded_columns_never_become_instances() {
        let outcome = parse(&page(PAYLOAD), "board.html");
        assert!(outcome
            .records
            .iter()
            .all(|r| !EXCLUDED_COLUMNS.contains(&r.instance())));
    }

    #[test]
    fn test_unrecognized_cell_is_kept_as_unsolved() {
        let payload = r#"{"columns":[{"name":"a_1.vrp"}],"entries":[{"name":"x","a_1.vrp":"DNF"}]}"#;
        let outcome = parse(&page(payload), "board.html");
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].is_unsolved());
        assert_eq!(outcome.records[0].time(), None);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnrecognizedCell {
                owner: "x".into(),
                column: "a_1.vrp".into(),
                text: "DNF".into(),
            }]
        );
    }

    #[test]
    fn test_missing_carrier_is_empty_result() {
        let outcome = parse("<html><body><table></table></body></html>", "board.html");
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.diagnostics, vec![Diagnostic::MissingCarrier]);
    }

    #[test]
    fn test_malformed_payload_is_empty_result() {
        let outcome = parse(&page("{\"columns\": [oops"), "board.html");
        assert!(outcome.records.is_empty());
        assert!(matches!(
            outcome.diagnostics[0],
            Diagnostic::MalformedPayload { .. }
        ));
    }

    #[test]
    fn test_entity_escaped_payload_in_div() {
        let html = "<div data-role=\"x\" id='board'>\
                    {&quot;columns&quot;:[{&quot;name&quot;:&quot;7_1.vrp&quot;}],\
                    &quot;entries&quot;:[{&quot;name&quot;:&quot;q&quot;,&quot;7_1.vrp&quot;:&quot;3 [1]&quot;}]}\
                    </DIV>";
        let outcome = parse_with_carrier(html, "board.htm", "board");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].score(), Some(3.0));
        assert_eq!(outcome.records[0].time(), Some(1.0));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let payload = r#"{"columns":[{"name":"a_1.vrp"}],
            "entries":[{"name":"x","a_1.vrp":"10"}, null, [1, 2], {"name":"y","a_1.vrp":"12"}]}"#;
        let outcome = parse(&page(payload), "board.html");

        let owners: Vec<&str> = outcome.records.iter().map(|r| r.entry_owner()).collect();
        assert_eq!(owners, ["x", "y"]);
        assert!(outcome.error_message().is_none());
        assert_eq!(
            outcome.diagnostics,
            vec![
                Diagnostic::MalformedRow {
                    row: 2,
                    reason: "expected an object, found null".into(),
                },
                Diagnostic::MalformedRow {
                    row: 3,
                    reason: "expected an object, found an array".into(),
                },
            ]
        );
    }

    #[test]
    fn test_nameless_columns_are_skipped() {
        let payload = r#"{"columns":[{"title":"x"}, {"name":"a_1.vrp"}, {"name": 4}],
            "entries":[{"name":"x","a_1.vrp":"10","x":"11"}]}"#;
        let outcome = parse(&page(payload), "board.html");

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].instance(), "a_1.vrp");
        assert_eq!(outcome.diagnostics.len(), 2);
        assert!(matches!(
            outcome.diagnostics[0],
            Diagnostic::MalformedColumn { position: 1, .. }
        ));
        assert!(matches!(
            outcome.diagnostics[1],
            Diagnostic::MalformedColumn { position: 3, .. }
        ));
        assert!(outcome.diagnostics.iter().all(|d| !d.is_structural()));
    }

    #[test]
    fn test_non_string_row_name_is_kept() {
        let payload = r#"{"columns":[{"name":"a_1.vrp"}],
            "entries":[{"name":7,"a_1.vrp":"10"}, {"name":null,"a_1.vrp":"11"}, {"name":"","a_1.vrp":"12"}]}"#;
        let outcome = parse(&page(payload), "board.html");

        let owners: Vec<&str> = outcome.records.iter().map(|r| r.entry_owner()).collect();
        assert_eq!(owners, ["7", UNKNOWN_PARTICIPANT, UNKNOWN_PARTICIPANT]);
    }

    #[test]
    fn test_data_id_attribute_is_not_the_carrier() {
        let html = format!(
            "<div data-id=\"leaderboard-data\">decoy</div>{}",
            page(r#"{"columns":[{"name":"a_1.vrp"}],"entries":[{"name":"x","a_1.vrp":"10"}]}"#)
        );
        let outcome = parse(&html, "board.html");
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.diagnostics.is_empty());

        let only_decoy = "<div aria-id=\"leaderboard-data\">{}</div>";
        assert_eq!(
            parse(only_decoy, "board.html").diagnostics,
            vec![Diagnostic::MissingCarrier]
        );
    }

    #[test]
    fn test_empty_payload_has_no_records() {
        let outcome = parse(&page("{}"), "board.html");
        assert!(outcome.records.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }
}
