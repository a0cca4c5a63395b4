//! Maps loosely-named filter keys to concrete field names.
//!
//! Resolution never fails.  Callers must treat the answer as best-effort:
//! an unknown key comes back as its upper-cased literal.

use std::sync::Arc;

use super::{DataSourceCatalog, FieldDescriptor};

/// Returned for an empty filter key.
pub const UNKNOWN_FIELD: &str = "UNKNOWN_FIELD";

/// Cross-source canonical names.  The first candidate present on the
/// source wins; otherwise the first candidate is used.
static COMMON_NAMES: &[(&str, &[&str])] = &[
    ("region", &["REGION", "AWS_REGION", "LOCATION", "ZONE"]),
    ("account", &["ACCOUNT_ID", "SUBSCRIPTION_ID", "PROJECT_ID"]),
    ("account_id", &["ACCOUNT_ID", "SUBSCRIPTION_ID", "PROJECT_ID"]),
    ("status", &["STATUS", "STATE", "POWER_STATE"]),
    ("state", &["STATE", "STATUS", "POWER_STATE"]),
    ("risk_score", &["RISK_SCORE", "CVSS_SCORE"]),
    ("risk", &["RISK_SCORE", "CVSS_SCORE"]),
    ("severity", &["SEVERITY"]),
    ("cloud_provider", &["CLOUD_PROVIDER"]),
    ("provider", &["CLOUD_PROVIDER"]),
    ("resource_type", &["RESOURCE_TYPE"]),
    ("public", &["IS_PUBLIC", "PUBLIC_IP", "EXTERNAL_IP"]),
    ("encrypted", &["ENCRYPTED", "DISK_ENCRYPTED"]),
    ("user", &["USER_NAME", "USERNAME", "USER_ARN"]),
    ("username", &["USERNAME", "USER_NAME"]),
    ("ip", &["SOURCE_IP", "SRC_IP", "PUBLIC_IP", "PRIVATE_IP"]),
    ("source_ip", &["SOURCE_IP", "SRC_IP"]),
    ("host", &["HOSTNAME", "MID"]),
    ("hostname", &["HOSTNAME"]),
    ("image", &["IMAGE_REPO", "IMAGE"]),
    ("cve", &["VULN_ID"]),
    ("event", &["EVENT_NAME"]),
    ("event_name", &["EVENT_NAME"]),
    ("error", &["ERROR_CODE"]),
    ("port", &["DST_PORT"]),
    ("namespace", &["NAMESPACE"]),
    ("cluster", &["CLUSTER_NAME"]),
];

/// Resolves filter keys against the catalog's field schemas.
#[derive(Clone)]
pub struct FieldResolver {
    catalog: Arc<DataSourceCatalog>,
}

impl FieldResolver {
    pub fn new(catalog: Arc<DataSourceCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve `filter_key` to a field name on `source`.
    pub fn resolve(&self, filter_key: &str, source: &str) -> String {
        let fields = self.catalog.fields_or_known(source);
        resolve_against(filter_key, &fields)
    }
}

/// Resolution ladder over an explicit field list.
pub fn resolve_against(filter_key: &str, fields: &[FieldDescriptor]) -> String {
    let key = filter_key.trim();
    if key.is_empty() {
        return UNKNOWN_FIELD.to_string();
    }
    let lower = key.to_lowercase();

    // 1. exact, case-insensitive
    if let Some(field) = fields.iter().find(|f| f.name.eq_ignore_ascii_case(key)) {
        return field.name.clone();
    }

    // 2. substring of name or description
    if lower.len() >= 3 {
        let spaced = lower.replace('_', " ");
        let hit = fields.iter().find(|f| {
            f.name.to_lowercase().contains(&lower)
                || f.description.as_deref().is_some_and(|d| {
                    let d = d.to_lowercase();
                    d.contains(&lower) || d.contains(&spaced)
                })
        });
        if let Some(field) = hit {
            return field.name.clone();
        }
    }

    // 3. common-name table
    if let Some((_, candidates)) = COMMON_NAMES.iter().find(|(k, _)| *k == lower) {
        let present = candidates
            .iter()
            .find(|c| fields.iter().any(|f| f.name.eq_ignore_ascii_case(c)));
        return present.unwrap_or(&candidates[0]).to_string();
    }

    // 4. literal
    key.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed;

    #[test]
    fn exact_match_is_case_insensitive() {
        let fields = seed::known_fields(seed::AWS_EC2_INSTANCES);
        assert_eq!(resolve_against("region", &fields), "REGION");
        assert_eq!(resolve_against("Risk_Score", &fields), "RISK_SCORE");
    }

    #[test]
    fn substring_matches_name_then_description() {
        let fields = seed::known_fields(seed::AZURE_VIRTUAL_MACHINES);
        assert_eq!(resolve_against("encrypted", &fields), "DISK_ENCRYPTED");
        let fields = seed::known_fields(seed::NETWORK_CONNECTIONS);
        assert_eq!(resolve_against("transport", &fields), "PROTOCOL");
    }

    #[test]
    fn common_name_prefers_present_candidate() {
        let fields = seed::known_fields(seed::CONTAINER_VULNERABILITIES);
        assert_eq!(resolve_against("risk_score", &fields), "CVSS_SCORE");
        let fields = seed::known_fields(seed::AWS_EC2_INSTANCES);
        assert_eq!(resolve_against("status", &fields), "STATE");
    }

    #[test]
    fn unknown_key_falls_back_to_literal() {
        let fields = seed::known_fields(seed::HOST_PROCESSES);
        assert_eq!(resolve_against("blast_radius", &fields), "BLAST_RADIUS");
        assert_eq!(resolve_against("", &fields), UNKNOWN_FIELD);
        assert_eq!(resolve_against("zz", &[]), "ZZ");
    }
}
