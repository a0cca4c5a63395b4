//! Filter extraction.
//!
//! Each check runs independently against the lowercased request and writes
//! into the shared parameter map.  Checks are not mutually exclusive; a
//! later check overwrites an earlier key of the same name.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::rules::contains_word;
use super::Parameters;

static RISK_LEVEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(critical|high|medium|low)[- ]risk\b").expect("valid risk regex")
});

static RISK_BOUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\brisk(?:[- ]scores?)?\s+(?:of\s+)?(at least|above|over|greater than|>=|at most|below|under|less than|<=)\s*(\d+(?:\.\d+)?)")
        .expect("valid risk bound regex")
});

static SEVERITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(critical|high|medium|low)\b").expect("valid severity regex")
});

/// Keyword → cloud provider tag.
static PROVIDERS: &[(&[&str], &str)] = &[
    (&["aws", "amazon"], "AWS"),
    (&["azure"], "Azure"),
    (&["gcp", "google cloud"], "GCP"),
];

/// Keyword → resource type tag.
static RESOURCE_TYPES: &[(&[&str], &str)] = &[
    (&["ec2", "instance", "vm", "virtual machine"], "instance"),
    (&["s3", "bucket"], "bucket"),
    (&["container"], "container"),
    (&["pod"], "pod"),
    (&["lambda", "function"], "function"),
    (&["rds", "database"], "database"),
    (&["security group"], "security-group"),
    (&["iam role", "roles"], "role"),
];

/// Keyword → status tag.  First hit wins.
static STATUSES: &[(&str, &str)] = &[
    ("running", "running"),
    ("stopped", "stopped"),
    ("terminated", "terminated"),
    ("inactive", "inactive"),
    ("active", "active"),
];

/// Extract filters from lowercased `text`.
pub fn extract(text: &str) -> Parameters {
    let mut params = Parameters::new();

    severity_and_risk(text, &mut params);

    let providers = tags(text, PROVIDERS);
    if !providers.is_empty() {
        params.insert("cloud_provider".into(), Value::String(providers.join(",")));
    }

    let resource_types = tags(text, RESOURCE_TYPES);
    if !resource_types.is_empty() {
        params.insert("resource_type".into(), Value::String(resource_types.join(",")));
    }

    if let Some((_, status)) = STATUSES.iter().find(|(k, _)| contains_word(text, k)) {
        params.insert("status".into(), Value::String((*status).into()));
    }

    if ["unencrypted", "not encrypted", "without encryption", "encryption disabled"]
        .iter()
        .any(|k| contains_word(text, k))
    {
        params.insert("encrypted".into(), Value::Bool(false));
    } else if contains_word(text, "encrypted") {
        params.insert("encrypted".into(), Value::Bool(true));
    }

    if ["public", "internet-facing", "internet facing", "exposed"]
        .iter()
        .any(|k| contains_word(text, k))
    {
        params.insert("public".into(), Value::Bool(true));
    } else if contains_word(text, "private") {
        params.insert("public".into(), Value::Bool(false));
    }

    params
}

fn severity_and_risk(text: &str, params: &mut Parameters) {
    if let Some(caps) = RISK_BOUND_RE.captures(text) {
        let op = match &caps[1] {
            "at most" | "below" | "under" | "less than" | "<=" => "<=",
            _ => ">=",
        };
        params.insert("risk_score".into(), Value::String(format!("{op}{}", &caps[2])));
        return;
    }
    if let Some(caps) = RISK_LEVEL_RE.captures(text) {
        let threshold = match &caps[1] {
            "critical" => ">=9",
            "high" => ">=7",
            "medium" => ">=4",
            _ => "<=3",
        };
        params.insert("risk_score".into(), Value::String(threshold.into()));
        return;
    }
    if let Some(caps) = SEVERITY_RE.captures(text) {
        params.insert("severity".into(), Value::String(caps[1].to_string()));
    }
}

fn tags(text: &str, table: &[(&[&str], &'static str)]) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| contains_word(text, k)))
        .map(|(_, tag)| *tag)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_phrase_beats_severity_word() {
        let p = extract("aws ec2 instances with high risk scores");
        assert_eq!(p["risk_score"], ">=7");
        assert!(!p.contains_key("severity"));
        assert_eq!(p["cloud_provider"], "AWS");
        assert_eq!(p["resource_type"], "instance");
    }

    #[test]
    fn explicit_risk_bound() {
        let p = extract("hosts with risk score above 8");
        assert_eq!(p["risk_score"], ">=8");
        let p = extract("risk below 3");
        assert_eq!(p["risk_score"], "<=3");
    }

    #[test]
    fn severity_and_multi_tags() {
        let p = extract("critical findings on aws and azure buckets and containers");
        assert_eq!(p["severity"], "critical");
        assert_eq!(p["cloud_provider"], "AWS,Azure");
        assert_eq!(p["resource_type"], "bucket,container");
    }

    #[test]
    fn boolean_flags() {
        let p = extract("unencrypted public buckets");
        assert_eq!(p["encrypted"], false);
        assert_eq!(p["public"], true);
        let p = extract("encrypted private volumes");
        assert_eq!(p["encrypted"], true);
        assert_eq!(p["public"], false);
    }

    #[test]
    fn status_first_hit() {
        assert_eq!(extract("running instances")["status"], "running");
        assert_eq!(extract("inactive users")["status"], "inactive");
        assert!(extract("hello").is_empty());
    }
}
