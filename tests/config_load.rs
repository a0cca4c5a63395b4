//! Integration test: configuration parsing, validation and file lookup.

use std::path::Path;

use query_forge::config::Config;

#[test]
fn example_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));

    let cfg = Config::from_yaml(&contents)
        .unwrap_or_else(|e| panic!("config.example.yaml failed to parse: {e:?}"));

    assert_eq!(cfg.catalog.cache_ttl_secs, 1800);
    assert_eq!(cfg.translator.default_window_hours, 24);
    assert!(cfg.registry.auto_register);
    assert_eq!(cfg.execution.max_rows, 1000);
}

#[test]
fn partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml("execution:\n  max_rows: 50\n").unwrap();
    assert_eq!(cfg.execution.max_rows, 50);
    assert_eq!(cfg.execution.timeout_secs, 120);
    assert_eq!(cfg.catalog.cache_ttl_secs, 30 * 60);
    assert_eq!(cfg.registry.prune_max_age_hours, 168);
    assert!((cfg.registry.min_generation_confidence - 0.7).abs() < f64::EPSILON);

    let widest = Config::from_yaml(&format!(
        "translator:\n  default_window_hours: {}\n",
        query_forge::config::MAX_WINDOW_HOURS
    ))
    .unwrap();
    assert_eq!(widest.translator.default_window_hours, 87_600);

    let empty = Config::from_yaml("{}").unwrap();
    assert_eq!(empty.translator.max_projected_fields, 8);
}

// ── deny_unknown_fields validation ──────────────────────────

#[test]
fn unknown_fields_rejected() {
    for yaml in [
        "foo_unknown: true\n",
        "catalog:\n  cache_ttl: 5\n",
        "registry:\n  auto_register: true\n  bogus_field: 42\n",
    ] {
        let err = Config::from_yaml(yaml).unwrap_err();
        let msg = format!("{err:?}");
        assert!(
            msg.contains("unknown field"),
            "error should mention the unknown field, got: {msg}"
        );
    }
}

#[test]
fn semantic_validation() {
    let cases = [
        ("execution:\n  max_rows: 0\n", "max_rows"),
        ("execution:\n  timeout_secs: 0\n", "timeouts"),
        ("catalog:\n  sample_rows: 0\n", "sample_rows"),
        ("registry:\n  min_generation_confidence: 1.5\n", "min_generation_confidence"),
        ("translator:\n  default_window_hours: 0\n", "default_window_hours"),
        (
            "translator:\n  default_window_hours: 18446744073709551615\n",
            "translator.default_window_hours must be at most",
        ),
        (
            "catalog:\n  sample_lookback_hours: 3000000000000000\n",
            "catalog.sample_lookback_hours must be at most",
        ),
        (
            "registry:\n  prune_max_age_hours: 87601\n",
            "registry.prune_max_age_hours must be at most",
        ),
    ];
    for (yaml, needle) in cases {
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains(needle), "{yaml:?}: {err}");
    }
}

// ── File lookup ─────────────────────────────────────────────

#[tokio::test]
async fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forge.yaml");
    std::fs::write(&path, "registry:\n  auto_register: false\n").unwrap();

    let cfg = Config::load(&path).await.unwrap();
    assert!(!cfg.registry.auto_register);
}

#[tokio::test]
async fn load_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "execution: [1, 2]\n").unwrap();

    let err = Config::load(&path).await.unwrap_err();
    assert!(format!("{err:?}").contains("failed to parse config YAML"));
}

#[tokio::test]
async fn missing_absolute_path_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("subdir").join("config.yaml");
    let cfg = Config::load(&missing).await.unwrap();
    assert_eq!(cfg.execution.max_rows, 1000);
}

#[tokio::test]
async fn forge_home_fallback_when_project_config_missing() {
    let home_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        home_dir.path().join("config.yaml"),
        "execution:\n  max_rows: 7\n",
    )
    .unwrap();

    // CWD must be a dir where config.yaml does NOT exist, otherwise the
    // relative path resolves immediately instead of triggering the fallback.
    let empty_dir = tempfile::tempdir().unwrap();
    let prev_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(empty_dir.path()).unwrap();

    unsafe { std::env::set_var("QUERY_FORGE_HOME", home_dir.path()); }

    let cfg = Config::load(Path::new("config.yaml"))
        .await
        .expect("should fall back to the forge home config");
    assert_eq!(cfg.execution.max_rows, 7);

    // Other file names never fall back.
    let cfg = Config::load(Path::new("other.yaml")).await.unwrap();
    assert_eq!(cfg.execution.max_rows, 1000);

    unsafe { std::env::remove_var("QUERY_FORGE_HOME"); }
    let _ = std::env::set_current_dir(&prev_dir);
}
