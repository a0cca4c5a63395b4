//! Data source catalog: discovery, caching, fallbacks and field discovery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use query_forge::catalog::{
    seed, DataSourceCatalog, DiscoveryFilter, FieldResolver, FieldType, SourceCategory,
};
use query_forge::config::CatalogConfig;
use query_forge::error::ExecutionError;
use query_forge::executor::{NullLister, Row, SourceLister, StaticExecutor};
use serde_json::json;

/// Lister that counts how often it was asked.
struct CountingLister {
    names: Vec<String>,
    calls: AtomicUsize,
}

impl CountingLister {
    fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceLister for CountingLister {
    async fn list_data_source_names(&self) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.clone())
    }
}

fn rows(value: serde_json::Value) -> Vec<Row> {
    serde_json::from_value(value).unwrap()
}

fn catalog_with(lister: Arc<dyn SourceLister>, executor: StaticExecutor) -> DataSourceCatalog {
    DataSourceCatalog::new(lister, Arc::new(executor), &CatalogConfig::default())
}

#[tokio::test]
async fn discover_merges_listed_names_with_seed() {
    let lister = Arc::new(NullLister::with_names([
        "LW_CFG_AWS_LAMBDA_FUNCTIONS",
        "LW_CFG_AZURE_SQL_SERVERS",
    ]));
    let catalog = catalog_with(lister, StaticExecutor::empty());

    let all = catalog.discover(&DiscoveryFilter::default()).await;
    assert!(all.iter().any(|s| s.name == "LW_CFG_AWS_LAMBDA_FUNCTIONS"));
    assert!(all.iter().any(|s| s.name == seed::CLOUDTRAIL_EVENTS));

    let azure = catalog
        .discover(&DiscoveryFilter {
            category: Some(SourceCategory::Azure),
            ..Default::default()
        })
        .await;
    let names: Vec<&str> = azure.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["LW_CFG_AZURE_COMPUTE_VIRTUAL_MACHINES", "LW_CFG_AZURE_SQL_SERVERS"]
    );
}

#[tokio::test]
async fn discover_filters_by_glob_provider_and_limit() {
    let catalog = catalog_with(Arc::new(NullLister::default()), StaticExecutor::empty());

    let aws_cfg = catalog
        .discover(&DiscoveryFilter {
            name_pattern: Some("lw_cfg_aws_*".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(aws_cfg.len(), 3);
    assert!(aws_cfg.iter().all(|s| s.name.starts_with("LW_CFG_AWS_")));

    let vuln = catalog
        .discover(&DiscoveryFilter {
            name_pattern: Some("vuln".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(vuln.len(), 2);

    let aws = catalog
        .discover(&DiscoveryFilter {
            provider: Some("AWS".into()),
            ..Default::default()
        })
        .await;
    assert!(aws.iter().any(|s| s.name == seed::CLOUDTRAIL_EVENTS));

    let limited = catalog
        .discover(&DiscoveryFilter {
            limit: Some(2),
            ..Default::default()
        })
        .await;
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn discovery_is_cached_until_refresh() {
    let lister = Arc::new(CountingLister::new(&["LW_CFG_AWS_EC2_INSTANCES"]));
    let catalog = catalog_with(lister.clone(), StaticExecutor::empty());

    catalog.init().await;
    catalog.discover(&DiscoveryFilter::default()).await;
    catalog.discover(&DiscoveryFilter::default()).await;
    assert_eq!(lister.calls(), 1);

    catalog.refresh().await;
    assert_eq!(lister.calls(), 2);

    catalog.teardown();
    catalog.discover(&DiscoveryFilter::default()).await;
    assert_eq!(lister.calls(), 3);
}

#[tokio::test]
async fn zero_ttl_lists_every_time() {
    let lister = Arc::new(CountingLister::new(&[]));
    let cfg = CatalogConfig {
        cache_ttl_secs: 0,
        ..CatalogConfig::default()
    };
    let catalog = DataSourceCatalog::new(lister.clone(), Arc::new(StaticExecutor::empty()), &cfg);
    catalog.discover(&DiscoveryFilter::default()).await;
    catalog.discover(&DiscoveryFilter::default()).await;
    assert_eq!(lister.calls(), 2);
}

#[tokio::test]
async fn listing_failure_falls_back_to_seed() {
    let catalog = catalog_with(Arc::new(NullLister::unreachable()), StaticExecutor::empty());
    let sources = catalog.discover(&DiscoveryFilter::default()).await;
    assert_eq!(sources.len(), seed::seed_descriptors().len());

    let k8s = catalog
        .discover(&DiscoveryFilter {
            category: Some(SourceCategory::Kubernetes),
            ..Default::default()
        })
        .await;
    assert_eq!(k8s.len(), 1);
    assert_eq!(k8s[0].name, seed::K8S_PODS);
}

#[tokio::test]
async fn describe_infers_fields_from_sample() {
    let executor = StaticExecutor::empty().source_rows(
        seed::AWS_EC2_INSTANCES,
        rows(json!([
            {
                "RESOURCE_ID": "i-0abc",
                "RISK_SCORE": 8,
                "PUBLIC_IP": null,
                "LAUNCH_TIME": "2026-01-04T09:12:00Z",
                "ARN": "arn:aws:ec2:us-east-1:123456789012:instance/i-0abc"
            },
            {
                "RESOURCE_ID": "i-0def",
                "RISK_SCORE": 3,
                "PUBLIC_IP": "54.1.2.3",
                "LAUNCH_TIME": "2026-01-05T10:00:00Z"
            },
            {
                "RESOURCE_ID": "i-0abc",
                "RISK_SCORE": 8,
                "LAUNCH_TIME": "2026-01-04T09:12:00Z"
            }
        ])),
    );
    let catalog = catalog_with(Arc::new(NullLister::default()), executor);

    let d = catalog.describe(seed::AWS_EC2_INSTANCES).await.unwrap();
    let fields = d.fields.unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["ARN", "LAUNCH_TIME", "PUBLIC_IP", "RESOURCE_ID", "RISK_SCORE"]
    );

    let by_name = |n: &str| fields.iter().find(|f| f.name == n).unwrap();
    assert_eq!(by_name("RISK_SCORE").field_type, FieldType::Integer);
    assert_eq!(by_name("LAUNCH_TIME").field_type, FieldType::Timestamp);
    assert_eq!(by_name("ARN").field_type, FieldType::IdentifierReference);
    assert_eq!(by_name("PUBLIC_IP").field_type, FieldType::IpAddress);
    assert!(by_name("PUBLIC_IP").nullable);
    assert!(by_name("ARN").nullable);
    assert!(!by_name("RESOURCE_ID").nullable);
    assert_eq!(by_name("RESOURCE_ID").sample_values, vec!["i-0abc", "i-0def"]);
    assert_eq!(
        by_name("RISK_SCORE").description.as_deref(),
        Some("Composite risk score from 0 to 10")
    );
}

#[tokio::test]
async fn describe_memoizes_field_discovery() {
    let executor = Arc::new(StaticExecutor::empty());
    let catalog = DataSourceCatalog::new(
        Arc::new(NullLister::default()),
        executor.clone(),
        &CatalogConfig::default(),
    );

    catalog.describe(seed::AWS_S3_BUCKETS).await.unwrap();
    catalog.describe(seed::AWS_S3_BUCKETS).await.unwrap();
    assert_eq!(executor.executed_queries().len(), 1);

    catalog.refresh_fields(seed::AWS_S3_BUCKETS).await;
    assert_eq!(executor.executed_queries().len(), 2);
}

#[tokio::test]
async fn empty_or_failed_sample_uses_known_fields() {
    let catalog = catalog_with(Arc::new(NullLister::default()), StaticExecutor::empty());
    let d = catalog.describe(seed::AWS_IAM_USERS).await.unwrap();
    assert_eq!(d.fields.unwrap(), seed::known_fields(seed::AWS_IAM_USERS));

    let catalog = catalog_with(
        Arc::new(NullLister::default()),
        StaticExecutor::failing(ExecutionError::Unauthenticated),
    );
    let fields = catalog.discover_fields(seed::CLOUDTRAIL_EVENTS).await;
    assert!(fields.iter().any(|f| f.name == "ERROR_CODE" && f.nullable));

    assert!(catalog.describe("NO_SUCH_SOURCE").await.is_none());
}

#[tokio::test]
async fn search_ranks_exact_name_matches_first() {
    let catalog = catalog_with(Arc::new(NullLister::default()), StaticExecutor::empty());
    catalog.init().await;

    let hits = catalog.search("ec2");
    assert_eq!(hits[0].name, seed::AWS_EC2_INSTANCES);

    let hits = catalog.search("vulnerabilities");
    let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec![seed::CONTAINER_VULNERABILITIES, seed::HOST_VULNERABILITIES]);

    assert!(catalog.search("").is_empty());
}

#[tokio::test]
async fn resolver_uses_discovered_fields() {
    let executor = StaticExecutor::empty().source_rows(
        "LW_CFG_OKTA_USERS",
        rows(json!([{ "LOGIN_EMAIL": "a@example.com", "MFA_FACTOR": "push" }])),
    );
    let lister = Arc::new(NullLister::with_names(["LW_CFG_OKTA_USERS"]));
    let catalog = Arc::new(catalog_with(lister, executor));
    let resolver = FieldResolver::new(Arc::clone(&catalog));

    // Nothing cached yet: unknown keys come back verbatim.
    assert_eq!(resolver.resolve("email", "LW_CFG_OKTA_USERS"), "EMAIL");

    catalog.describe("LW_CFG_OKTA_USERS").await.unwrap();
    assert_eq!(resolver.resolve("email", "LW_CFG_OKTA_USERS"), "LOGIN_EMAIL");
    assert_eq!(resolver.resolve("mfa_factor", "lw_cfg_okta_users"), "MFA_FACTOR");
    assert_eq!(resolver.resolve("", "LW_CFG_OKTA_USERS"), "UNKNOWN_FIELD");
}
