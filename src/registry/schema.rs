//! Input schemas and argument rules of dynamic capabilities.
//!
//! A capability's arguments are described twice: as a JSON Schema the
//! caller sees, and as a list of [`ArgumentRule`]s the registry applies
//! when the capability is invoked.  Both are derived from the parameter
//! keys of the translation the capability was created from.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::executor::TimeRange;
use crate::translator::{query, Parameters};

/// How one invocation argument changes the bound query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ArgumentRule {
    /// `field = value`, an IN-list, or a boolean equality.
    Equals { argument: String },
    /// Numeric lower bound.  Strings with a comparison prefix are kept.
    Threshold { argument: String },
    /// RFC 3339 start of the window.
    StartTime,
    /// RFC 3339 end of the window.
    EndTime,
    /// Any other argument whose key is a plain identifier and is not bound
    /// by the query already becomes an equality (or threshold) condition.
    AnyAbsentKey,
}

pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";

static ARGUMENT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid argument key regex"));

fn is_threshold(key: &str) -> bool {
    key == "risk_score" || key.ends_with("_score")
}

/// Argument rules for the parameter keys of a translation.
pub fn argument_rules(parameters: &Parameters) -> Vec<ArgumentRule> {
    let mut rules: Vec<ArgumentRule> = parameters
        .keys()
        .map(|key| {
            if is_threshold(key) {
                ArgumentRule::Threshold {
                    argument: key.clone(),
                }
            } else {
                ArgumentRule::Equals {
                    argument: key.clone(),
                }
            }
        })
        .collect();
    rules.push(ArgumentRule::StartTime);
    rules.push(ArgumentRule::EndTime);
    rules.push(ArgumentRule::AnyAbsentKey);
    rules
}

fn property_schema(key: &str) -> Value {
    match key {
        "severity" => json!({
            "type": "string",
            "enum": ["critical", "high", "medium", "low", "info"],
            "description": "Minimum finding severity"
        }),
        "cloud_provider" => json!({
            "type": "string",
            "enum": ["AWS", "Azure", "GCP"],
            "description": "Cloud provider, comma-separated for several"
        }),
        "encrypted" => json!({
            "type": "boolean",
            "description": "Match encrypted (true) or unencrypted (false) resources"
        }),
        "public" => json!({
            "type": "boolean",
            "description": "Match publicly exposed (true) or private (false) resources"
        }),
        "status" => json!({
            "type": "string",
            "description": "Resource or finding status"
        }),
        "resource_type" => json!({
            "type": "string",
            "description": "Resource type, comma-separated for several"
        }),
        k if is_threshold(k) => json!({
            "type": "number",
            "minimum": 0,
            "maximum": 10,
            "description": "Lower bound; pass a string such as \"<=3\" for other comparisons"
        }),
        _ => json!({ "type": "string" }),
    }
}

/// JSON Schema for a capability built from `parameters`.
pub fn input_schema(parameters: &Parameters) -> Value {
    let mut properties = Map::new();
    for key in parameters.keys() {
        properties.insert(key.clone(), property_schema(key));
    }
    properties.insert(
        START_TIME.into(),
        json!({
            "type": "string",
            "format": "date-time",
            "description": "Window start (RFC 3339). Defaults to the original window length before now"
        }),
    );
    properties.insert(
        END_TIME.into(),
        json!({
            "type": "string",
            "format": "date-time",
            "description": "Window end (RFC 3339). Defaults to now"
        }),
    );
    json!({
        "type": "object",
        "properties": properties,
        "required": [],
    })
}

/// Extra filter conditions for `args`.
///
/// Only keys absent from `base` apply; the bound query already encodes
/// those.  Declared arguments come first, then (with
/// [`ArgumentRule::AnyAbsentKey`]) every other identifier-shaped key in
/// key order.  `resolve` maps an argument name to a field of the source.
pub fn extra_conditions<F>(
    rules: &[ArgumentRule],
    args: &Value,
    base: &Parameters,
    resolve: F,
) -> Vec<String>
where
    F: Fn(&str) -> String,
{
    let mut out = Vec::new();
    let mut declared: Vec<&str> = Vec::new();
    let mut open = false;

    for rule in rules {
        let (argument, threshold) = match rule {
            ArgumentRule::Equals { argument } => (argument.as_str(), false),
            ArgumentRule::Threshold { argument } => (argument.as_str(), true),
            ArgumentRule::AnyAbsentKey => {
                open = true;
                continue;
            }
            ArgumentRule::StartTime | ArgumentRule::EndTime => continue,
        };
        declared.push(argument);
        if base.contains_key(argument) {
            continue;
        }
        if let Some(value) = args.get(argument) {
            out.extend(condition_for(argument, value, threshold, &resolve));
        }
    }

    if open {
        if let Some(map) = args.as_object() {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                if key == START_TIME
                    || key == END_TIME
                    || declared.contains(&key.as_str())
                    || base.contains_key(key.as_str())
                    || !ARGUMENT_KEY_RE.is_match(key)
                {
                    continue;
                }
                out.extend(condition_for(key, &map[key], is_threshold(key), &resolve));
            }
        }
    }
    out
}

fn condition_for<F>(argument: &str, value: &Value, threshold: bool, resolve: &F) -> Option<String>
where
    F: Fn(&str) -> String,
{
    let value = match (threshold, value) {
        (true, Value::Number(n)) => Value::String(format!(">={n}")),
        (true, Value::String(s)) if s.trim().parse::<f64>().is_ok_and(f64::is_finite) => {
            Value::String(format!(">={}", s.trim()))
        }
        _ => value.clone(),
    };
    query::render_condition(&resolve(argument), &value)
}

fn timestamp_arg(args: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = args.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Invocation window.
///
/// Explicit `start_time`/`end_time` arguments win.  Otherwise the length
/// of `original` is re-anchored at `now`.  A start after the end is
/// clamped to the end.
pub fn invocation_window(
    rules: &[ArgumentRule],
    args: &Value,
    original: Option<TimeRange>,
    default_span: chrono::Duration,
    now: DateTime<Utc>,
) -> TimeRange {
    let span = original.map(|r| r.span()).unwrap_or(default_span);
    let end = rules
        .contains(&ArgumentRule::EndTime)
        .then(|| timestamp_arg(args, END_TIME))
        .flatten()
        .unwrap_or(now);
    let start = rules
        .contains(&ArgumentRule::StartTime)
        .then(|| timestamp_arg(args, START_TIME))
        .flatten()
        .unwrap_or(end - span);
    TimeRange {
        start: start.min(end),
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(pairs: &[(&str, Value)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn schema_types_well_known_keys() {
        let schema = input_schema(&params(&[
            ("severity", json!("critical")),
            ("public", json!(true)),
            ("team", json!("blue")),
        ]));
        let props = &schema["properties"];
        assert_eq!(props["severity"]["enum"][0], "critical");
        assert_eq!(props["public"]["type"], "boolean");
        assert_eq!(props["team"]["type"], "string");
        assert_eq!(props["start_time"]["format"], "date-time");
        assert!(props.get("end_time").is_some());
    }

    #[test]
    fn only_absent_keys_become_conditions() {
        let base = params(&[("severity", json!("critical"))]);
        let rules = argument_rules(&params(&[
            ("severity", json!("critical")),
            ("risk_score", json!(">=7")),
            ("region", json!("x")),
        ]));
        let args = json!({"severity": "low", "risk_score": 5, "region": "us-east-1"});
        let conds = extra_conditions(&rules, &args, &base, |k| k.to_uppercase());
        assert_eq!(conds, vec!["REGION = 'us-east-1'", "RISK_SCORE >= 5"]);
    }

    #[test]
    fn undeclared_keys_apply_when_identifier_shaped() {
        let base = params(&[("severity", json!("critical"))]);
        let rules = argument_rules(&base);
        let args = json!({
            "severity": "low",
            "region": "eu-west-1",
            "cvss_score": 9,
            "start_time": "2026-02-01T00:00:00Z",
            "x') or (1=1": "y",
            "tags.env": "prod"
        });
        let conds = extra_conditions(&rules, &args, &base, |k| k.to_uppercase());
        assert_eq!(conds, vec!["CVSS_SCORE >= 9", "REGION = 'eu-west-1'"]);

        let closed = vec![ArgumentRule::StartTime, ArgumentRule::EndTime];
        assert!(extra_conditions(&closed, &args, &base, |k| k.to_uppercase()).is_empty());
    }

    #[test]
    fn rules_round_trip_as_tagged_json() {
        let rules = argument_rules(&params(&[("risk_score", json!(">=7"))]));
        let v = serde_json::to_value(&rules).unwrap();
        assert_eq!(v[0]["rule"], "threshold");
        assert_eq!(v[3]["rule"], "any_absent_key");
        let back: Vec<ArgumentRule> = serde_json::from_value(v).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn schema_marks_every_argument_optional() {
        let schema = input_schema(&Parameters::new());
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn window_reanchors_or_uses_explicit_bounds() {
        let rules = argument_rules(&Parameters::new());
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let original = TimeRange::trailing(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            chrono::Duration::hours(1),
        );

        let w = invocation_window(&rules, &json!({}), Some(original), chrono::Duration::hours(24), now);
        assert_eq!(w.end, now);
        assert_eq!(w.span(), chrono::Duration::hours(1));

        let args = json!({"start_time": "2026-02-01T00:00:00Z", "end_time": "2026-02-02T00:00:00Z"});
        let w = invocation_window(&rules, &args, Some(original), chrono::Duration::hours(24), now);
        assert_eq!(w.span(), chrono::Duration::hours(24));
        assert_eq!(w.end, Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap());
    }
}
