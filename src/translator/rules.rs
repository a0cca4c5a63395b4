//! Ordered rule tables driving translation.
//!
//! Every table is evaluated top to bottom and the first matching entry
//! wins.  Keyword predicates match at word starts of the lowercased
//! request, so `pod` matches "pods" but not "tripod".

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::catalog::seed;

/// Keyword predicate over lowercased text.
#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    /// Any keyword occurs.
    Any(&'static [&'static str]),
    /// Every group has at least one occurring keyword.
    All(&'static [&'static [&'static str]]),
}

impl Predicate {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Predicate::Any(words) => words.iter().any(|w| contains_word(text, w)),
            Predicate::All(groups) => groups
                .iter()
                .all(|group| group.iter().any(|w| contains_word(text, w))),
        }
    }
}

/// True when `needle` occurs in `haystack` starting at a word boundary.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

// ── Data source identification ──────────────────────────────

pub struct SourceRule {
    pub predicate: Predicate,
    pub source: &'static str,
}

const fn source_rule(predicate: Predicate, source: &'static str) -> SourceRule {
    SourceRule { predicate, source }
}

/// Keyword → data source, most specific first.
pub static SOURCE_RULES: &[SourceRule] = &[
    source_rule(
        Predicate::All(&[&["vulnerab", "cve"], &["container", "image", "docker"]]),
        seed::CONTAINER_VULNERABILITIES,
    ),
    source_rule(
        Predicate::Any(&["vulnerab", "cve", "cvss", "unpatched"]),
        seed::HOST_VULNERABILITIES,
    ),
    source_rule(
        Predicate::Any(&["cloudtrail", "api call", "console login", "login", "sign-in", "signin"]),
        seed::CLOUDTRAIL_EVENTS,
    ),
    source_rule(Predicate::Any(&["ec2"]), seed::AWS_EC2_INSTANCES),
    source_rule(Predicate::Any(&["s3", "bucket"]), seed::AWS_S3_BUCKETS),
    source_rule(Predicate::Any(&["iam", "mfa", "access key"]), seed::AWS_IAM_USERS),
    source_rule(Predicate::Any(&["azure"]), seed::AZURE_VIRTUAL_MACHINES),
    source_rule(Predicate::Any(&["gcp", "google cloud", "gce"]), seed::GCP_COMPUTE_INSTANCES),
    source_rule(Predicate::Any(&["kubernetes", "k8s", "pod"]), seed::K8S_PODS),
    source_rule(Predicate::Any(&["container"]), seed::HOST_CONTAINERS),
    source_rule(
        Predicate::Any(&["process", "executable", "command line"]),
        seed::HOST_PROCESSES,
    ),
    source_rule(
        Predicate::Any(&["connection", "traffic", "inbound", "outbound", "port"]),
        seed::NETWORK_CONNECTIONS,
    ),
    source_rule(
        Predicate::Any(&["compliance", "compliant", "non-compliant", "cis benchmark", "pci", "soc2", "hipaa"]),
        seed::COMPLIANCE_EVALUATIONS,
    ),
    source_rule(Predicate::Any(&["host", "machine", "server"]), seed::HOST_MACHINES),
    source_rule(Predicate::Any(&["local user", "user account", "shell"]), seed::HOST_USERS),
];

/// Coarse topic ladder used when neither keywords nor the catalog
/// identified a source.
pub static DEFAULT_LADDER: &[SourceRule] = &[
    source_rule(
        Predicate::Any(&["complian", "audit", "benchmark", "policy", "policies"]),
        seed::COMPLIANCE_EVALUATIONS,
    ),
    source_rule(
        Predicate::All(&[&["vulnerab", "exploit", "cve"], &["container", "image", "docker"]]),
        seed::CONTAINER_VULNERABILITIES,
    ),
    source_rule(
        Predicate::Any(&["kubernetes", "k8s", "cluster", "namespace", "deployment"]),
        seed::K8S_PODS,
    ),
    source_rule(
        Predicate::Any(&["network", "ip", "dns", "firewall", "traffic"]),
        seed::NETWORK_CONNECTIONS,
    ),
    source_rule(
        Predicate::Any(&["user", "auth", "identity", "credential", "password", "permission"]),
        seed::AWS_IAM_USERS,
    ),
];

/// Source used when nothing else applies.
pub const GLOBAL_DEFAULT_SOURCE: &str = seed::AWS_EC2_INSTANCES;

// ── Pattern classification ──────────────────────────────────

/// Literal baseline parameter value.
#[derive(Debug, Clone, Copy)]
pub enum ParamLit {
    Str(&'static str),
    Bool(bool),
}

impl ParamLit {
    pub fn to_value(self) -> Value {
        match self {
            ParamLit::Str(s) => Value::String(s.to_string()),
            ParamLit::Bool(b) => Value::Bool(b),
        }
    }
}

pub struct PatternRule {
    pub pattern: &'static str,
    pub category: &'static str,
    pub params: &'static [(&'static str, ParamLit)],
    pub suggested_name: &'static str,
}

const fn pattern(
    pattern: &'static str,
    category: &'static str,
    params: &'static [(&'static str, ParamLit)],
    suggested_name: &'static str,
) -> PatternRule {
    PatternRule {
        pattern,
        category,
        params,
        suggested_name,
    }
}

static PATTERN_RULES: &[PatternRule] = &[
    pattern(
        r"\b(critical|high)[- ]?(severity\s+)?vulnerabilit",
        "vulnerability-assessment",
        &[],
        "find-severe-vulnerabilities",
    ),
    pattern(
        r"\bvulnerab|\bcves?\b|\bunpatched\b",
        "vulnerability-assessment",
        &[],
        "find-vulnerabilities",
    ),
    pattern(
        r"\b(high|critical|elevated)[- ]risk\b|\brisk[- ]scores?\b|\brisky\b",
        "risk-assessment",
        &[("risk_score", ParamLit::Str(">=7"))],
        "assess-high-risk-resources",
    ),
    pattern(
        r"\bnon-?compliant\b|\bfail(ed|ing)\s+(compliance|polic|controls?)",
        "compliance",
        &[("status", ParamLit::Str("NonCompliant"))],
        "find-compliance-violations",
    ),
    pattern(
        r"\bcomplian|\bcis\b|\bpci\b|\bsoc ?2\b|\bhipaa\b|\bbenchmark",
        "compliance",
        &[],
        "review-compliance-posture",
    ),
    pattern(
        r"\b(failed|unsuccessful|denied)\s+(console\s+)?(logins?|sign-?ins?|auth\w*|attempts?|api\s+calls?)",
        "authentication-activity",
        &[],
        "find-failed-authentication",
    ),
    pattern(
        r"\bunencrypted\b|\bnot\s+encrypted\b|\bwithout\s+encryption\b|\bencryption\s+disabled\b",
        "data-protection",
        &[("encrypted", ParamLit::Bool(false))],
        "find-unencrypted-resources",
    ),
    pattern(
        r"\bpublic(ly)?\b|\binternet[- ]facing\b|\bexposed\b|\bopen\s+to\s+the\s+(internet|world)\b",
        "exposure-analysis",
        &[("public", ParamLit::Bool(true))],
        "find-public-resources",
    ),
    pattern(
        r"\b(privileged|admin(istrator)?s?|root)\b.*\b(users?|roles?|accounts?|access|containers?|pods?)\b|\bmfa\b",
        "identity-access",
        &[],
        "review-privileged-access",
    ),
    pattern(
        r"\b(connections?|traffic|inbound|outbound|ports?)\b",
        "network-activity",
        &[],
        "analyze-network-activity",
    ),
    pattern(
        r"\b(containers?|pods?|kubernetes|k8s|images?)\b",
        "container-security",
        &[],
        "inspect-container-workloads",
    ),
    pattern(
        r"\b(cloudtrail|api\s+calls?|activity|audit\s+logs?|events?)\b",
        "activity-audit",
        &[],
        "review-cloud-activity",
    ),
    pattern(
        r"\b(instances?|buckets?|resources?|machines?|hosts?|inventory|assets?|vms?)\b",
        "inventory",
        &[],
        "list-cloud-inventory",
    ),
];

static COMPILED_PATTERNS: Lazy<Vec<(Regex, &'static PatternRule)>> = Lazy::new(|| {
    PATTERN_RULES
        .iter()
        .map(|rule| (Regex::new(rule.pattern).expect("valid pattern rule"), rule))
        .collect()
});

/// First pattern rule matching lowercased `text`.
pub fn classify(text: &str) -> Option<&'static PatternRule> {
    COMPILED_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, rule)| *rule)
}

// ── Time windows ────────────────────────────────────────────

pub struct TimeRule {
    pub predicate: Predicate,
    pub hours: i64,
}

static TIME_RULES: &[TimeRule] = &[
    TimeRule {
        predicate: Predicate::Any(&["last hour", "past hour", "last 1 hour"]),
        hours: 1,
    },
    TimeRule {
        predicate: Predicate::Any(&["last 24 hours", "past 24 hours", "last day", "past day", "today", "24h"]),
        hours: 24,
    },
    TimeRule {
        predicate: Predicate::Any(&["last week", "past week", "this week"]),
        hours: 7 * 24,
    },
    TimeRule {
        predicate: Predicate::Any(&["last month", "past month", "this month"]),
        hours: 30 * 24,
    },
    TimeRule {
        predicate: Predicate::Any(&["last 7 days", "past 7 days", "7d"]),
        hours: 7 * 24,
    },
    TimeRule {
        predicate: Predicate::Any(&["last 30 days", "past 30 days", "30d"]),
        hours: 30 * 24,
    },
];

static RELATIVE_WINDOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:last|past)\s+(\d{1,4})\s+(hour|day|week)s?\b").expect("valid window regex")
});

/// Window length in hours named by lowercased `text`, if any.
pub fn window_hours(text: &str) -> Option<i64> {
    if let Some(rule) = TIME_RULES.iter().find(|r| r.predicate.matches(text)) {
        return Some(rule.hours);
    }
    let caps = RELATIVE_WINDOW_RE.captures(text)?;
    let n: i64 = caps[1].parse().ok()?;
    let unit = match &caps[2] {
        "hour" => 1,
        "day" => 24,
        _ => 7 * 24,
    };
    (n > 0).then_some(n * unit)
}
