//! Translation scenarios and invariants.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use query_forge::catalog::{seed, DataSourceCatalog};
use query_forge::config::{CatalogConfig, TranslatorConfig};
use query_forge::executor::{NullLister, StaticExecutor};
use query_forge::translator::{IntentTranslator, SourceOrigin, TranslateOptions};

fn translator() -> IntentTranslator {
    let catalog = Arc::new(DataSourceCatalog::new(
        Arc::new(NullLister::default()),
        Arc::new(StaticExecutor::empty()),
        &CatalogConfig::default(),
    ));
    IntentTranslator::new(catalog, &TranslatorConfig::default())
}

#[tokio::test]
async fn high_risk_ec2_instances() {
    let t = translator();
    let r = t
        .translate("show me AWS EC2 instances with high risk scores")
        .await;

    assert_eq!(r.category, "risk-assessment");
    assert_eq!(r.data_source, seed::AWS_EC2_INSTANCES);
    assert_eq!(r.source_origin, SourceOrigin::Keyword);
    assert!(r.parameters.contains_key("risk_score"));
    assert!(r.confidence >= 0.7, "confidence {}", r.confidence);
    assert!(r.query.contains("LW_CFG_AWS_EC2_INSTANCES"));
    assert!(r.query.contains("RISK_SCORE >= 7"), "{}", r.query);
    assert!(r.query.contains("CLOUD_PROVIDER = 'AWS'"), "{}", r.query);
}

#[tokio::test]
async fn critical_container_vulnerabilities() {
    let t = translator();
    let r = t.translate("find critical vulnerabilities in containers").await;

    assert_eq!(r.data_source, seed::CONTAINER_VULNERABILITIES);
    assert_eq!(r.category, "vulnerability-assessment");
    assert_eq!(r.suggested_name, "find-severe-vulnerabilities");
    assert_eq!(r.parameters["severity"], "critical");
    assert!(r.query.contains("SEVERITY = 'critical'"), "{}", r.query);
}

#[tokio::test]
async fn failed_logins_get_heuristic_conditions_and_window() {
    let t = translator();
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
    let opts = TranslateOptions {
        fields: Vec::new(),
        now: Some(now),
    };
    let r = t
        .translate_with("failed console logins in the last hour", &opts)
        .await;

    assert_eq!(r.data_source, seed::CLOUDTRAIL_EVENTS);
    assert_eq!(r.category, "authentication-activity");
    assert!(r.query.contains("ERROR_CODE is not null"), "{}", r.query);
    assert!(r.query.contains("EVENT_NAME = 'ConsoleLogin'"), "{}", r.query);

    let range = r.time_range.expect("time range");
    assert_eq!(range.end, now);
    assert_eq!(range.span(), chrono::Duration::hours(1));
}

#[tokio::test]
async fn default_window_is_trailing_day() {
    let t = translator();
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
    let opts = TranslateOptions {
        fields: Vec::new(),
        now: Some(now),
    };
    let r = t.translate_with("list s3 buckets", &opts).await;
    let range = r.time_range.unwrap();
    assert_eq!(range.span(), chrono::Duration::hours(24));

    let r = t
        .translate_with("compliance findings from the past week", &opts)
        .await;
    assert_eq!(r.time_range.unwrap().span(), chrono::Duration::hours(168));
}

#[tokio::test]
async fn requested_fields_are_resolved_into_projection() {
    let t = translator();
    let opts = TranslateOptions {
        fields: vec!["region".into(), "account".into()],
        now: None,
    };
    let r = t.translate_with("running ec2 instances", &opts).await;
    assert_eq!(r.plan.projection, vec!["REGION", "ACCOUNT_ID"]);
    assert!(r.query.contains("return distinct {\n        REGION, ACCOUNT_ID"));
    assert!(r.query.contains("STATE = 'running'"), "{}", r.query);
}

#[tokio::test]
async fn unrecognised_request_still_produces_query() {
    let t = translator();
    let r = t.translate("hello there").await;
    assert_eq!(r.category, "general");
    assert_eq!(r.suggested_name, "query-hello");
    assert_eq!(r.source_origin, SourceOrigin::Default);
    assert_eq!(r.data_source, seed::AWS_EC2_INSTANCES);
    assert_eq!(r.confidence, 0.5);
    assert!(!r.query.is_empty());
}

#[tokio::test]
async fn topic_ladder_picks_source_when_keywords_miss() {
    let t = translator();
    let r = t.translate("who changed the firewall").await;
    assert_eq!(r.data_source, seed::NETWORK_CONNECTIONS);
    assert_eq!(r.source_origin, SourceOrigin::Inferred);
}

#[tokio::test]
async fn translation_invariants_hold_across_inputs() {
    let t = translator();
    let inputs = [
        "",
        "   ",
        "show me everything",
        "public unencrypted s3 buckets in azure and gcp",
        "privileged pods in the last 3 days",
        "non-compliant resources for CIS",
        "processes running as root on hosts",
        "outbound connections to port 22 in the last 30 days",
        "vulnerabilities with cvss above 9 that are fixable",
        "iam users without mfa",
    ];
    for input in inputs {
        let r = t.translate(input).await;
        assert!(
            (0.0..=1.0).contains(&r.confidence),
            "{input:?}: confidence {}",
            r.confidence
        );
        assert!(!r.query.trim().is_empty(), "{input:?}: empty query");
        let range = r.time_range.expect("time range");
        assert!(range.start <= range.end, "{input:?}: inverted window");
        assert!(!r.suggested_name.is_empty());
    }
}

#[tokio::test]
async fn translation_serializes_time_range_as_rfc3339() {
    let t = translator();
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
    let opts = TranslateOptions {
        fields: Vec::new(),
        now: Some(now),
    };
    let r = t.translate_with("list s3 buckets", &opts).await;
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["time_range"]["end"], "2026-05-01T10:00:00Z");
    assert_eq!(v["source_origin"], "keyword");
}
