use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Upper bound for every window or age expressed in hours (ten years).
pub const MAX_WINDOW_HOURS: u64 = 10 * 365 * 24;

/// Data source catalog settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Lifetime of the discovery set in seconds. Default: 1800 (30 minutes).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Lookback window of the field-discovery sample query, in hours.
    #[serde(default = "default_sample_lookback_hours")]
    pub sample_lookback_hours: u64,
    /// Max rows inspected when inferring field types.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
    /// Time budget for a sample query in seconds.
    #[serde(default = "default_sample_timeout_secs")]
    pub sample_timeout_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_sample_lookback_hours() -> u64 {
    24
}

fn default_sample_rows() -> usize {
    10
}

fn default_sample_timeout_secs() -> u64 {
    60
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            sample_lookback_hours: default_sample_lookback_hours(),
            sample_rows: default_sample_rows(),
            sample_timeout_secs: default_sample_timeout_secs(),
        }
    }
}

/// Intent translator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranslatorConfig {
    /// Number of fields projected when no fields were requested.
    #[serde(default = "default_max_projected_fields")]
    pub max_projected_fields: usize,
    /// Trailing window used when the request names no time phrase.
    #[serde(default = "default_window_hours")]
    pub default_window_hours: u64,
}

fn default_max_projected_fields() -> usize {
    8
}

fn default_window_hours() -> u64 {
    24
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_projected_fields: default_max_projected_fields(),
            default_window_hours: default_window_hours(),
        }
    }
}

/// Dynamic capability registry settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Register a capability whenever a translated query returns rows.
    #[serde(default = "default_true")]
    pub auto_register: bool,
    /// Confidence a reverse-inferred translation needs before it is
    /// registered under an unknown tool name.
    #[serde(default = "default_min_generation_confidence")]
    pub min_generation_confidence: f64,
    /// Idle age after which unused capabilities are pruned, in hours.
    #[serde(default = "default_prune_max_age_hours")]
    pub prune_max_age_hours: u64,
}

fn default_true() -> bool {
    true
}

fn default_min_generation_confidence() -> f64 {
    0.7
}

fn default_prune_max_age_hours() -> u64 {
    7 * 24
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auto_register: true,
            min_generation_confidence: default_min_generation_confidence(),
            prune_max_age_hours: default_prune_max_age_hours(),
        }
    }
}

/// Query execution limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Time budget per query in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Row ceiling applied uniformly to every result.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_rows() -> usize {
    1000
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_rows: default_max_rows(),
        }
    }
}

/// Top-level configuration loaded from `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl Config {
    /// Read and parse a YAML configuration file.
    ///
    /// A relative `config.yaml` that does not exist is looked up under
    /// [`forge_home`](crate::forge_home).  When no file exists at all the
    /// defaults are used.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let filename = path.file_name().and_then(|f| f.to_str());
                let eligible = filename == Some("config.yaml") && path.is_relative();
                let home_path = crate::forge_home().join("config.yaml");
                match tokio::fs::read_to_string(&home_path).await {
                    Ok(c) if eligible => {
                        tracing::warn!(
                            attempted = %path.display(),
                            found = %home_path.display(),
                            "config file not found, falling back to home directory"
                        );
                        c
                    }
                    _ => {
                        tracing::debug!(
                            path = %path.display(),
                            "no config file, using defaults"
                        );
                        return Ok(Config::default());
                    }
                }
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };

        let config = Self::from_yaml(&contents)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(contents: &str) -> anyhow::Result<Config> {
        let config: Config =
            serde_yaml_ng::from_str(contents).context("failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints that serde cannot enforce.
    fn validate(&self) -> anyhow::Result<()> {
        if self.catalog.sample_rows == 0 {
            anyhow::bail!("config: catalog.sample_rows must be at least 1");
        }
        if self.catalog.sample_timeout_secs == 0 || self.execution.timeout_secs == 0 {
            anyhow::bail!("config: timeouts must be greater than zero");
        }
        if self.execution.max_rows == 0 {
            anyhow::bail!("config: execution.max_rows must be at least 1");
        }
        if self.translator.max_projected_fields == 0 {
            anyhow::bail!("config: translator.max_projected_fields must be at least 1");
        }
        if self.translator.default_window_hours == 0 {
            anyhow::bail!("config: translator.default_window_hours must be at least 1");
        }
        for (key, hours) in [
            ("translator.default_window_hours", self.translator.default_window_hours),
            ("catalog.sample_lookback_hours", self.catalog.sample_lookback_hours),
            ("registry.prune_max_age_hours", self.registry.prune_max_age_hours),
        ] {
            if hours > MAX_WINDOW_HOURS {
                anyhow::bail!("config: {key} must be at most {MAX_WINDOW_HOURS}, got {hours}");
            }
        }
        let floor = self.registry.min_generation_confidence;
        if !(0.0..=1.0).contains(&floor) {
            anyhow::bail!(
                "config: registry.min_generation_confidence must be within [0, 1], got {floor}"
            );
        }
        Ok(())
    }
}
