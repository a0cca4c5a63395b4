//! Data source catalog.
//!
//! Tracks the data sources the telemetry platform exposes and their field
//! schemas.  The discovery set is cached for a single TTL and swapped as a
//! whole on refresh, so readers always see a complete snapshot.  Field sets
//! are memoized per source and only re-discovered on explicit refresh.

pub mod infer;
pub mod resolver;
pub mod seed;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, MAX_WINDOW_HOURS};
use crate::executor::{execute_bounded, QueryExecutor, Row, SourceLister, TimeRange};
use crate::text::{naive_stem, tokenize};

pub use resolver::FieldResolver;

// ── Types ───────────────────────────────────────────────────

/// Coarse grouping of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceCategory {
    Aws,
    Azure,
    Gcp,
    Kubernetes,
    Host,
    Network,
    Vulnerability,
    Configuration,
    Activity,
    Compliance,
    General,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Aws => "aws",
            SourceCategory::Azure => "azure",
            SourceCategory::Gcp => "gcp",
            SourceCategory::Kubernetes => "kubernetes",
            SourceCategory::Host => "host",
            SourceCategory::Network => "network",
            SourceCategory::Vulnerability => "vulnerability",
            SourceCategory::Configuration => "configuration",
            SourceCategory::Activity => "activity",
            SourceCategory::Compliance => "compliance",
            SourceCategory::General => "general",
        }
    }

    /// Human label used in generated descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            SourceCategory::Aws => "AWS",
            SourceCategory::Azure => "Azure",
            SourceCategory::Gcp => "GCP",
            SourceCategory::Kubernetes => "Kubernetes",
            SourceCategory::Host => "Host",
            SourceCategory::Network => "Network",
            SourceCategory::Vulnerability => "Vulnerability",
            SourceCategory::Configuration => "Configuration",
            SourceCategory::Activity => "Activity",
            SourceCategory::Compliance => "Compliance",
            SourceCategory::General => "General",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            SourceCategory::Aws,
            SourceCategory::Azure,
            SourceCategory::Gcp,
            SourceCategory::Kubernetes,
            SourceCategory::Host,
            SourceCategory::Network,
            SourceCategory::Vulnerability,
            SourceCategory::Configuration,
            SourceCategory::Activity,
            SourceCategory::Compliance,
            SourceCategory::General,
        ];
        all.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Inferred type of a data source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    IpAddress,
    IdentifierReference,
    Object,
    Null,
    Unknown,
}

/// One field of a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Distinct sampled values, at most three, each truncated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_values: Vec<String>,
    #[serde(default)]
    pub nullable: bool,
}

/// A queryable data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceDescriptor {
    pub name: String,
    pub category: SourceCategory,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rows: Option<Vec<Row>>,
}

/// Filters applied by [`DataSourceCatalog::discover`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryFilter {
    /// Case-insensitive substring, or a `*` glob.
    #[serde(default)]
    pub name_pattern: Option<String>,
    #[serde(default)]
    pub category: Option<SourceCategory>,
    /// Provider keyword (aws, azure, gcp) matched against name and description.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl DiscoveryFilter {
    fn matches(&self, source: &DataSourceDescriptor, name_re: Option<&Regex>) -> bool {
        if let Some(pattern) = &self.name_pattern {
            let hit = match name_re {
                Some(re) => re.is_match(&source.name),
                None => source
                    .name
                    .to_lowercase()
                    .contains(&pattern.to_lowercase()),
            };
            if !hit {
                return false;
            }
        }
        if let Some(category) = self.category {
            if source.category != category {
                return false;
            }
        }
        if let Some(provider) = &self.provider {
            let p = provider.to_lowercase();
            if !source.name.to_lowercase().contains(&p)
                && !source.description.to_lowercase().contains(&p)
            {
                return false;
            }
        }
        true
    }
}

/// Compile a `*` glob into an anchored case-insensitive regex.
fn glob_regex(pattern: &str) -> Option<Regex> {
    if !pattern.contains('*') {
        return None;
    }
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i)^{body}$")).ok()
}

// ── Catalog ─────────────────────────────────────────────────

#[derive(Default)]
struct CatalogState {
    sources: Arc<Vec<DataSourceDescriptor>>,
    fetched_at: Option<Instant>,
    fields: HashMap<String, Arc<Vec<FieldDescriptor>>>,
}

/// Discovers and describes data sources, caching what it learns.
pub struct DataSourceCatalog {
    lister: Arc<dyn SourceLister>,
    executor: Arc<dyn QueryExecutor>,
    ttl: Duration,
    sample_lookback: chrono::Duration,
    sample_rows: usize,
    sample_timeout: Duration,
    state: RwLock<CatalogState>,
}

impl DataSourceCatalog {
    pub fn new(
        lister: Arc<dyn SourceLister>,
        executor: Arc<dyn QueryExecutor>,
        cfg: &CatalogConfig,
    ) -> Self {
        Self {
            lister,
            executor,
            ttl: Duration::from_secs(cfg.cache_ttl_secs),
            sample_lookback: chrono::Duration::hours(
                cfg.sample_lookback_hours.min(MAX_WINDOW_HOURS) as i64,
            ),
            sample_rows: cfg.sample_rows,
            sample_timeout: Duration::from_secs(cfg.sample_timeout_secs),
            state: RwLock::new(CatalogState::default()),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Warm the discovery cache.
    pub async fn init(&self) {
        let sources = self.discover(&DiscoveryFilter::default()).await;
        debug!(sources = sources.len(), "catalog initialised");
    }

    /// Drop every cache and re-discover.
    pub async fn refresh(&self) -> Vec<DataSourceDescriptor> {
        {
            let mut state = self.state.write().expect("catalog lock poisoned");
            state.fetched_at = None;
            state.fields.clear();
        }
        self.discover(&DiscoveryFilter::default()).await
    }

    /// Re-run field discovery for one source.
    pub async fn refresh_fields(&self, name: &str) -> Vec<FieldDescriptor> {
        let fields = self.discover_fields(name).await;
        self.memoize_fields(name, fields.clone());
        fields
    }

    /// Empty all caches.
    pub fn teardown(&self) {
        let mut state = self.state.write().expect("catalog lock poisoned");
        *state = CatalogState::default();
        debug!("catalog torn down");
    }

    // ── Discovery ───────────────────────────────────────────

    /// List data sources matching `filter`.
    ///
    /// Served from cache while it is fresh.  Otherwise the listing
    /// collaborator is asked and the cache re-seeded; if that fails the
    /// static seed is filtered instead and the cache is left untouched.
    pub async fn discover(&self, filter: &DiscoveryFilter) -> Vec<DataSourceDescriptor> {
        if let Some(snapshot) = self.fresh_snapshot() {
            return self.apply_filter(&snapshot, filter);
        }

        match self.lister.list_data_source_names().await {
            Ok(names) => {
                let snapshot = Arc::new(build_source_set(&names));
                {
                    let mut state = self.state.write().expect("catalog lock poisoned");
                    state.sources = Arc::clone(&snapshot);
                    state.fetched_at = Some(Instant::now());
                }
                info!(
                    listed = names.len(),
                    total = snapshot.len(),
                    "data source catalog refreshed"
                );
                self.apply_filter(&snapshot, filter)
            }
            Err(e) => {
                warn!(error = %e, "data source listing failed, using seed catalog");
                self.apply_filter(&seed::seed_descriptors(), filter)
            }
        }
    }

    /// Describe one source with its fields populated.
    pub async fn describe(&self, name: &str) -> Option<DataSourceDescriptor> {
        let mut source = self
            .discover(&DiscoveryFilter::default())
            .await
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))?;

        let fields = match self.cached_fields(&source.name) {
            Some(fields) => fields.as_ref().clone(),
            None => {
                let fields = self.discover_fields(&source.name).await;
                self.memoize_fields(&source.name, fields.clone());
                fields
            }
        };
        source.fields = Some(fields);
        Some(source)
    }

    /// Sample `name` and infer its field schema.
    ///
    /// Falls back to the static known-fields table when the sample is
    /// empty or execution fails.
    pub async fn discover_fields(&self, name: &str) -> Vec<FieldDescriptor> {
        let query = crate::translator::query::render_sample(name);
        let range = TimeRange::trailing(Utc::now(), self.sample_lookback);

        match execute_bounded(self.executor.as_ref(), &query, Some(range), self.sample_timeout)
            .await
        {
            Ok(result) if !result.rows.is_empty() => {
                let rows = &result.rows[..result.rows.len().min(self.sample_rows)];
                let mut fields = infer::fields_from_rows(rows);
                enrich_descriptions(name, &mut fields);
                debug!(source = name, fields = fields.len(), "fields discovered from sample");
                fields
            }
            Ok(_) => {
                debug!(source = name, "empty sample, using known fields");
                seed::known_fields(name)
            }
            Err(e) => {
                warn!(source = name, error = %e, "field discovery failed, using known fields");
                seed::known_fields(name)
            }
        }
    }

    /// Sources whose name, category or description share a token with
    /// `text`.  Exact substring-of-name matches rank first, then
    /// alphabetical.
    pub fn search(&self, text: &str) -> Vec<DataSourceDescriptor> {
        let needle = text.trim().to_lowercase();
        let query: Vec<String> = crate::text::significant_words(text)
            .iter()
            .filter(|t| t.len() >= 3)
            .map(|t| naive_stem(t))
            .collect();
        if needle.is_empty() {
            return Vec::new();
        }

        let snapshot = self.snapshot();
        let mut hits: Vec<(bool, &DataSourceDescriptor)> = snapshot
            .iter()
            .filter_map(|s| {
                let name_lower = s.name.to_lowercase();
                let exact = name_lower.contains(&needle)
                    || name_lower.contains(&needle.replace(' ', "_"));
                let haystack: Vec<String> = tokenize(&s.name)
                    .into_iter()
                    .chain(tokenize(s.category.as_str()))
                    .chain(tokenize(&s.description))
                    .map(|t| naive_stem(&t))
                    .collect();
                let overlap = query.iter().any(|q| haystack.contains(q));
                (exact || overlap).then_some((exact, s))
            })
            .collect();

        hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
        hits.into_iter().map(|(_, s)| s.clone()).collect()
    }

    // ── Cache access ────────────────────────────────────────

    /// Memoized fields for `name`, if discovery already ran.
    pub fn cached_fields(&self, name: &str) -> Option<Arc<Vec<FieldDescriptor>>> {
        let state = self.state.read().expect("catalog lock poisoned");
        state
            .fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| Arc::clone(v))
    }

    /// Memoized fields, or the static table when nothing is cached.
    pub fn fields_or_known(&self, name: &str) -> Arc<Vec<FieldDescriptor>> {
        self.cached_fields(name)
            .unwrap_or_else(|| Arc::new(seed::known_fields(name)))
    }

    /// Current descriptor set: the cache if populated (even if stale),
    /// otherwise the seed.
    pub fn snapshot(&self) -> Arc<Vec<DataSourceDescriptor>> {
        let state = self.state.read().expect("catalog lock poisoned");
        if state.sources.is_empty() {
            Arc::new(seed::seed_descriptors())
        } else {
            Arc::clone(&state.sources)
        }
    }

    fn fresh_snapshot(&self) -> Option<Arc<Vec<DataSourceDescriptor>>> {
        let state = self.state.read().expect("catalog lock poisoned");
        match state.fetched_at {
            Some(at) if at.elapsed() < self.ttl && !state.sources.is_empty() => {
                Some(Arc::clone(&state.sources))
            }
            _ => None,
        }
    }

    fn memoize_fields(&self, name: &str, fields: Vec<FieldDescriptor>) {
        let mut state = self.state.write().expect("catalog lock poisoned");
        state.fields.insert(name.to_string(), Arc::new(fields));
    }

    fn apply_filter(
        &self,
        sources: &[DataSourceDescriptor],
        filter: &DiscoveryFilter,
    ) -> Vec<DataSourceDescriptor> {
        let name_re = filter.name_pattern.as_deref().and_then(glob_regex);
        let limit = filter.limit.unwrap_or(usize::MAX);
        sources
            .iter()
            .filter(|s| filter.matches(s, name_re.as_ref()))
            .take(limit)
            .map(|s| {
                let mut s = s.clone();
                if let Some(fields) = self.cached_fields(&s.name) {
                    s.fields = Some(fields.as_ref().clone());
                }
                s
            })
            .collect()
    }
}

/// Categorize listed names and merge in seeded sources they lack.
fn build_source_set(names: &[String]) -> Vec<DataSourceDescriptor> {
    let mut out: Vec<DataSourceDescriptor> = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim();
        if name.is_empty() || out.iter().any(|s| s.name == name) {
            continue;
        }
        let descriptor = seed::seed_descriptor(name).unwrap_or_else(|| DataSourceDescriptor {
            name: name.to_string(),
            category: infer::categorize(name),
            description: infer::describe_raw_name(name),
            fields: None,
            sample_rows: None,
        });
        out.push(descriptor);
    }
    for seeded in seed::seed_descriptors() {
        if !out.iter().any(|s| s.name.eq_ignore_ascii_case(&seeded.name)) {
            out.push(seeded);
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Copy static descriptions onto sampled fields that share a name.
fn enrich_descriptions(source: &str, fields: &mut [FieldDescriptor]) {
    let known = seed::known_fields(source);
    for field in fields.iter_mut() {
        if let Some(k) = known.iter().find(|k| k.name.eq_ignore_ascii_case(&field.name)) {
            field.description = k.description.clone();
        }
    }
}
