//! Structured query construction.
//!
//! Queries use the platform's block syntax:
//!
//! ```text
//! {
//!     source {
//!         LW_CFG_AWS_EC2_INSTANCES
//!     }
//!     filter {
//!         RISK_SCORE >= 7 and CLOUD_PROVIDER = 'AWS'
//!     }
//!     return distinct {
//!         RESOURCE_ID, ACCOUNT_ID, REGION
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::Predicate;
use crate::catalog::{seed, FieldDescriptor, SourceCategory};

/// Source, rendered conditions and projection of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub source: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub projection: Vec<String>,
}

impl QueryPlan {
    pub fn render(&self) -> String {
        render(&self.source, &self.conditions, &self.projection)
    }

    /// Copy of this plan with `extra` conditions appended.
    pub fn with_conditions<I: IntoIterator<Item = String>>(&self, extra: I) -> QueryPlan {
        let mut plan = self.clone();
        for condition in extra {
            if !plan.conditions.contains(&condition) {
                plan.conditions.push(condition);
            }
        }
        plan
    }
}

/// Render a query.  Empty `conditions` or `projection` omit their block.
pub fn render(source: &str, conditions: &[String], projection: &[String]) -> String {
    let mut out = String::from("{\n");
    out.push_str(&format!("    source {{\n        {source}\n    }}\n"));
    if !conditions.is_empty() {
        out.push_str(&format!(
            "    filter {{\n        {}\n    }}\n",
            conditions.join(" and ")
        ));
    }
    if !projection.is_empty() {
        out.push_str(&format!(
            "    return distinct {{\n        {}\n    }}\n",
            projection.join(", ")
        ));
    }
    out.push('}');
    out
}

/// Bare query used to sample rows for field discovery.
pub fn render_sample(source: &str) -> String {
    render(source, &[], &[])
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn literal(s: &str) -> String {
    let s = s.trim();
    if s.parse::<f64>().is_ok_and(f64::is_finite) {
        s.to_string()
    } else if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        s.to_lowercase()
    } else {
        quote(s)
    }
}

/// Render one comparison of `field` against `value`.
///
/// Strings with a leading `>=`, `<=`, `>`, `<` or `!=` become
/// inequalities, comma-joined strings and arrays become IN-lists.
/// Objects cannot be compared and yield `None`.
pub fn render_condition(field: &str, value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(format!("{field} is null")),
        Value::Bool(b) => Some(format!("{field} = {b}")),
        Value::Number(n) => Some(format!("{field} = {n}")),
        Value::Array(items) => {
            let rendered: Vec<String> = items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(literal(s)),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect();
            (!rendered.is_empty()).then(|| format!("{field} in ({})", rendered.join(", ")))
        }
        Value::Object(_) => None,
        Value::String(s) => {
            let s = s.trim();
            for op in [">=", "<=", "!=", ">", "<"] {
                if let Some(rest) = s.strip_prefix(op) {
                    return Some(format!("{field} {op} {}", literal(rest)));
                }
            }
            if s.contains(',') {
                let items: Vec<String> = s
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(literal)
                    .collect();
                return Some(format!("{field} in ({})", items.join(", ")));
            }
            if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
                return Some(format!("{field} = {}", s.to_lowercase()));
            }
            Some(format!("{field} = {}", quote(s)))
        }
    }
}

// ── Source-specific heuristics ──────────────────────────────

struct Heuristic {
    sources: &'static [&'static str],
    predicate: Predicate,
    condition: &'static str,
}

static HEURISTICS: &[Heuristic] = &[
    Heuristic {
        sources: &[seed::CLOUDTRAIL_EVENTS],
        predicate: Predicate::Any(&["failed", "failure", "denied", "unauthorized", "error"]),
        condition: "ERROR_CODE is not null",
    },
    Heuristic {
        sources: &[seed::CLOUDTRAIL_EVENTS],
        predicate: Predicate::Any(&["console login", "login", "sign-in", "signin"]),
        condition: "EVENT_NAME = 'ConsoleLogin'",
    },
    Heuristic {
        sources: &[seed::CLOUDTRAIL_EVENTS],
        predicate: Predicate::Any(&["root account", "root user"]),
        condition: "USER_TYPE = 'Root'",
    },
    Heuristic {
        sources: &[seed::AWS_IAM_USERS],
        predicate: Predicate::Any(&["without mfa", "no mfa", "mfa disabled"]),
        condition: "MFA_ENABLED = false",
    },
    Heuristic {
        sources: &[seed::AWS_IAM_USERS],
        predicate: Predicate::Any(&["admin"]),
        condition: "IS_ADMIN = true",
    },
    Heuristic {
        sources: &[seed::HOST_PROCESSES],
        predicate: Predicate::Any(&["as root", "root process", "by root"]),
        condition: "USERNAME = 'root'",
    },
    Heuristic {
        sources: &[seed::K8S_PODS, seed::HOST_CONTAINERS],
        predicate: Predicate::Any(&["privileged"]),
        condition: "PRIVILEGED = true",
    },
    Heuristic {
        sources: &[seed::CONTAINER_VULNERABILITIES, seed::HOST_VULNERABILITIES],
        predicate: Predicate::Any(&["fixable", "fix available", "patch available"]),
        condition: "FIX_AVAILABLE = true",
    },
];

/// Conditions implied by the wording of a request against `source`.
pub fn heuristic_conditions(source: &str, text: &str) -> Vec<String> {
    HEURISTICS
        .iter()
        .filter(|h| h.sources.iter().any(|s| s.eq_ignore_ascii_case(source)))
        .filter(|h| h.predicate.matches(text))
        .map(|h| h.condition.to_string())
        .collect()
}

// ── Projection ──────────────────────────────────────────────

/// Fields preferred in projections, highest priority first.
static FIELD_PRIORITY: &[&str] = &[
    "RESOURCE_ID",
    "ARN",
    "ACCOUNT_ID",
    "SUBSCRIPTION_ID",
    "PROJECT_ID",
    "REGION",
    "AWS_REGION",
    "LOCATION",
    "ZONE",
    "RESOURCE_TYPE",
    "SEVERITY",
    "RISK_SCORE",
    "CVSS_SCORE",
    "VULN_ID",
    "STATUS",
    "STATE",
    "EVENT_TIME",
    "EVENT_NAME",
    "USER_NAME",
    "USERNAME",
    "USER_ARN",
    "SOURCE_IP",
    "SRC_IP",
    "DST_IP",
    "DST_PORT",
    "MID",
    "HOSTNAME",
    "IMAGE_REPO",
    "IMAGE_TAG",
    "CLUSTER_NAME",
    "NAMESPACE",
    "POD_NAME",
    "PROCESS_NAME",
    "CLOUD_PROVIDER",
];

/// Fields returned when nothing is known about a source's schema.
fn provider_defaults(category: SourceCategory) -> &'static [&'static str] {
    match category {
        SourceCategory::Aws => &["ACCOUNT_ID", "REGION", "RESOURCE_ID", "RESOURCE_TYPE"],
        SourceCategory::Azure => &["SUBSCRIPTION_ID", "RESOURCE_GROUP", "RESOURCE_ID", "LOCATION"],
        SourceCategory::Gcp => &["PROJECT_ID", "ZONE", "RESOURCE_ID"],
        SourceCategory::Kubernetes => &["CLUSTER_NAME", "NAMESPACE", "POD_NAME"],
        SourceCategory::Host => &["MID", "HOSTNAME"],
        SourceCategory::Network => &["SRC_IP", "DST_IP", "DST_PORT"],
        SourceCategory::Vulnerability => &["VULN_ID", "SEVERITY", "PACKAGE_NAME"],
        SourceCategory::Activity => &["EVENT_TIME", "EVENT_NAME", "SOURCE_IP"],
        SourceCategory::Compliance => &["RESOURCE_ID", "POLICY_ID", "STATUS"],
        SourceCategory::Configuration | SourceCategory::General => &["RESOURCE_ID"],
    }
}

/// Choose the projected fields.
///
/// Explicitly requested fields (already resolved) win, then the top
/// `max` known fields by priority, then the category defaults.
pub fn projection(
    requested: &[String],
    fields: &[FieldDescriptor],
    category: SourceCategory,
    max: usize,
) -> Vec<String> {
    if !requested.is_empty() {
        let mut out: Vec<String> = Vec::new();
        for field in requested {
            if !out.contains(field) {
                out.push(field.clone());
            }
        }
        return out;
    }

    if !fields.is_empty() {
        let mut ranked: Vec<&FieldDescriptor> = fields.iter().collect();
        ranked.sort_by(|a, b| {
            let pa = FIELD_PRIORITY.iter().position(|p| *p == a.name).unwrap_or(usize::MAX);
            let pb = FIELD_PRIORITY.iter().position(|p| *p == b.name).unwrap_or(usize::MAX);
            pa.cmp(&pb).then_with(|| a.name.cmp(&b.name))
        });
        return ranked.into_iter().take(max).map(|f| f.name.clone()).collect();
    }

    provider_defaults(category)
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conditions_by_value_shape() {
        assert_eq!(
            render_condition("RISK_SCORE", &json!(">=7")).unwrap(),
            "RISK_SCORE >= 7"
        );
        assert_eq!(
            render_condition("CLOUD_PROVIDER", &json!("AWS,Azure")).unwrap(),
            "CLOUD_PROVIDER in ('AWS', 'Azure')"
        );
        assert_eq!(
            render_condition("IS_PUBLIC", &json!(true)).unwrap(),
            "IS_PUBLIC = true"
        );
        assert_eq!(
            render_condition("SEVERITY", &json!("critical")).unwrap(),
            "SEVERITY = 'critical'"
        );
        assert_eq!(
            render_condition("NAME", &json!("o'brien")).unwrap(),
            "NAME = 'o\\'brien'"
        );
        assert_eq!(
            render_condition("PORT", &json!([22, 3389])).unwrap(),
            "PORT in (22, 3389)"
        );
        assert!(render_condition("TAGS", &json!({"a": 1})).is_none());
    }

    #[test]
    fn non_finite_numbers_are_quoted() {
        assert_eq!(
            render_condition("RISK_SCORE", &json!(">=nan")).unwrap(),
            "RISK_SCORE >= 'nan'"
        );
        assert_eq!(
            render_condition("RISK_SCORE", &json!("<inf")).unwrap(),
            "RISK_SCORE < 'inf'"
        );
        assert_eq!(
            render_condition("CVSS_SCORE", &json!("infinity,9.8")).unwrap(),
            "CVSS_SCORE in ('infinity', 9.8)"
        );
    }

    #[test]
    fn render_omits_empty_blocks() {
        let q = render_sample("LW_HE_MACHINES");
        assert!(q.contains("source {\n        LW_HE_MACHINES"));
        assert!(!q.contains("filter"));
        assert!(!q.contains("return"));

        let q = render("S", &["A = 1".into(), "B = 2".into()], &["X".into()]);
        assert!(q.contains("A = 1 and B = 2"));
        assert!(q.contains("return distinct {\n        X\n    }"));
    }

    #[test]
    fn failed_keyword_adds_error_condition() {
        let conds = heuristic_conditions(seed::CLOUDTRAIL_EVENTS, "failed console logins");
        assert!(conds.contains(&"ERROR_CODE is not null".to_string()));
        assert!(heuristic_conditions(seed::HOST_MACHINES, "failed").is_empty());
    }

    #[test]
    fn projection_precedence() {
        let fields = seed::known_fields(seed::AWS_EC2_INSTANCES);
        let requested = vec!["REGION".to_string(), "REGION".to_string()];
        assert_eq!(
            projection(&requested, &fields, SourceCategory::Aws, 3),
            vec!["REGION"]
        );
        assert_eq!(
            projection(&[], &fields, SourceCategory::Aws, 3),
            vec!["RESOURCE_ID", "ARN", "ACCOUNT_ID"]
        );
        assert_eq!(
            projection(&[], &[], SourceCategory::Gcp, 3),
            vec!["PROJECT_ID", "ZONE", "RESOURCE_ID"]
        );
    }
}
