//! Shape-based inference: data source categories from raw names and field
//! types from sampled values.

use std::collections::BTreeMap;
use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{FieldDescriptor, FieldType, SourceCategory};
use crate::executor::Row;
use crate::text::truncate_chars;

/// Max distinct sample values kept per field.
pub const MAX_SAMPLES: usize = 3;
/// Max chars kept per sample value.
pub const MAX_SAMPLE_CHARS: usize = 100;

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("valid timestamp regex")
});

static ARN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(arn:[a-z0-9-]+:[a-z0-9-]*:|/subscriptions/[0-9a-f-]+/|projects/[a-z0-9-]+/)")
        .expect("valid arn regex")
});

/// Ordered category ladder over upper-cased raw names with a trailing `_`
/// appended, so `_LOG_` matches a final `_LOG` segment.  First hit wins.
static CATEGORY_LADDER: &[(&[&str], SourceCategory)] = &[
    // provider keywords
    (&["_AWS_", "AWS_"], SourceCategory::Aws),
    (&["AZURE"], SourceCategory::Azure),
    (&["GCP", "GOOGLE"], SourceCategory::Gcp),
    (&["K8S", "KUBERNETES"], SourceCategory::Kubernetes),
    // category keywords
    (&["VULN"], SourceCategory::Vulnerability),
    (&["_HE_"], SourceCategory::Host),
    (&["_HA_", "CONNECTION", "NETWORK", "DNS"], SourceCategory::Network),
    (&["_CFG_"], SourceCategory::Configuration),
    // activity / audit
    (&["CLOUDTRAIL", "ACTIVITY", "AUDIT", "EVENTS", "_LOG_", "_LOGS_"], SourceCategory::Activity),
    // compliance
    (&["COMPLIANCE", "CIS", "POLICY", "POLICIES"], SourceCategory::Compliance),
];

/// Categorize a raw data source name.
pub fn categorize(name: &str) -> SourceCategory {
    let upper = format!("{}_", name.to_uppercase());
    CATEGORY_LADDER
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(SourceCategory::General)
}

/// Readable description for a source that is not seeded.
pub fn describe_raw_name(name: &str) -> String {
    let words: Vec<String> = name
        .split('_')
        .filter(|w| !w.is_empty() && *w != "LW" && *w != "CFG" && *w != "HE" && *w != "HA")
        .map(|w| w.to_lowercase())
        .collect();
    let category = categorize(name);
    if words.is_empty() {
        format!("{} data source", category.label())
    } else {
        format!("{} data: {}", category.label(), words.join(" "))
    }
}

/// Infer the type of a single sampled value.
pub fn infer_field_type(value: &Value) -> FieldType {
    match value {
        Value::Null => FieldType::Null,
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
        Value::Number(_) => FieldType::Float,
        Value::String(s) => infer_string_type(s),
        Value::Object(_) | Value::Array(_) => FieldType::Object,
    }
}

fn infer_string_type(s: &str) -> FieldType {
    let s = s.trim();
    if s.is_empty() {
        return FieldType::String;
    }
    if s.parse::<i64>().is_ok() {
        return FieldType::Integer;
    }
    if s.parse::<f64>().is_ok() && s.chars().any(|c| c == '.') {
        return FieldType::Float;
    }
    if TIMESTAMP_RE.is_match(s) {
        return FieldType::Timestamp;
    }
    if s.parse::<IpAddr>().is_ok() {
        return FieldType::IpAddress;
    }
    if ARN_RE.is_match(s) {
        return FieldType::IdentifierReference;
    }
    FieldType::String
}

/// Render a sample value for display.
fn sample_string(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_chars(&raw, MAX_SAMPLE_CHARS)
}

#[derive(Default)]
struct FieldAccumulator {
    field_type: Option<FieldType>,
    samples: Vec<String>,
    seen: usize,
    saw_null: bool,
}

/// Build field descriptors from sampled rows, sorted by name.
///
/// A field's type comes from its first non-null value.  A field missing
/// from some rows, or null in any, is nullable.
pub fn fields_from_rows(rows: &[Row]) -> Vec<FieldDescriptor> {
    let mut acc: BTreeMap<String, FieldAccumulator> = BTreeMap::new();

    for row in rows {
        for (key, value) in row {
            let entry = acc.entry(key.clone()).or_default();
            entry.seen += 1;
            if value.is_null() {
                entry.saw_null = true;
                continue;
            }
            if entry.field_type.is_none() {
                entry.field_type = Some(infer_field_type(value));
            }
            let sample = sample_string(value);
            if entry.samples.len() < MAX_SAMPLES && !entry.samples.contains(&sample) {
                entry.samples.push(sample);
            }
        }
    }

    acc.into_iter()
        .map(|(name, a)| FieldDescriptor {
            name,
            field_type: a.field_type.unwrap_or(FieldType::Null),
            description: None,
            sample_values: a.samples,
            nullable: a.saw_null || a.seen < rows.len(),
        })
        .collect()
}
