//! Instance file name decoding.
//!
//! Benchmark instances are conventionally named `{customers}_{vehicles}_{variant}.vrp`.
//! Anything else still yields a usable base name so records can be grouped.

use crate::models::ParsedInstanceName;

/// Extensions stripped before decoding (matched case-insensitively).
pub const KNOWN_EXTENSIONS: &[&str] = &[".vrp", ".txt", ".sol", ".json"];

/// Variant used when the name carries none.
pub const DEFAULT_VARIANT: &str = "default";

/// Decode an instance name. Total: never fails.
pub fn parse(name: &str) -> ParsedInstanceName {
    let stem = strip_extension(name);

    let segments: Vec<&str> = stem.split('_').collect();
    if segments.len() >= 2 {
        if let (Some(customers), Some(vehicles)) =
            (parse_count(segments[0]), parse_count(segments[1]))
        {
            let rest = &segments[2..];
            let problem_variant = if rest.is_empty() {
                DEFAULT_VARIANT.to_string()
            } else {
                rest.join("_")
            };
            return ParsedInstanceName {
                num_customers: Some(customers),
                num_vehicles: Some(vehicles),
                problem_variant: Some(problem_variant),
                base_instance_name: format!("{}_{}", customers, vehicles),
            };
        }
    }

    if let Some((base, variant)) = stem.rsplit_once('_') {
        if !base.is_empty() && !variant.is_empty() {
            return ParsedInstanceName {
                num_customers: None,
                num_vehicles: None,
                problem_variant: Some(variant.to_string()),
                base_instance_name: base.to_string(),
            };
        }
    }

    ParsedInstanceName {
        num_customers: None,
        num_vehicles: None,
        problem_variant: Some(DEFAULT_VARIANT.to_string()),
        base_instance_name: fallback_base(stem, name),
    }
}

fn strip_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    KNOWN_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &name[..name.len() - ext.len()])
        .unwrap_or(name)
}

/// Plain unsigned decimal only: signs, spaces and empty segments are rejected.
fn parse_count(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn fallback_base(stem: &str, name: &str) -> String {
    if !stem.is_empty() {
        stem.to_string()
    } else if !name.is_empty() {
        name.to_string()
    } else {
        "unnamed".to_string()
    }
}
