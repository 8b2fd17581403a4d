//! Config file loading tests.

use std::fs;

use bi_dash::analytics::RegionLookup;
use bi_dash::config::Config;
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"
[api]
base_url = "https://bi.example.com/api"
database_id = 4
username = "analyst"
poll_interval_ms = 250

[queries.sales_report]
sql = "SELECT * FROM weekly_sales WHERE week_start = {{week_start}}"
numeric = ["curr_rev", "prev_rev"]

[regions]
"61" = "Poznań city"
"6" = "Wielkopolska"
"#;

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, CONFIG).unwrap();

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.api.database_id().unwrap(), 4);
    assert_eq!(config.api.poll_settings().unwrap().interval.as_millis(), 250);
    assert_eq!(config.api.poll_timeout_secs, 60);
    assert_eq!(
        config.get_query("sales_report").unwrap().numeric,
        vec!["curr_rev", "prev_rev"]
    );

    let lookup = RegionLookup::from_config(&config.regions);
    assert_eq!(lookup.resolve("61-001"), Some("Poznań city"));
    assert_eq!(lookup.resolve("64-100"), Some("Wielkopolska"));
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert!(config.queries.is_empty());
    assert!(config.api.base_url.is_none());
    assert_eq!(RegionLookup::from_config(&config.regions), RegionLookup::default());
}

#[test]
fn test_invalid_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[api\nbase_url = 1").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert_eq!(err.category(), "Configuration Error");
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn test_example_config_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
    let config = Config::load_from_file(&path).unwrap();

    for name in ["sales_report", "trend_week", "trend_day", "orders_by_postcode"] {
        assert!(config.get_query(name).is_ok(), "missing query {name}");
    }
}
