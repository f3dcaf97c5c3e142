use std::fs;

use tempfile::TempDir;

use biomind::access::{FeatureFlag, QueryQuota};
use biomind::config::{CliOverrides, Config, load_config, save_config};
use biomind::providers::ProviderId;

#[test]
fn test_saved_config_round_trips_through_loader() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.history_window = 6;
    config.quota_exempt_callers = vec!["lab-admin".to_string()];
    save_config(&config, &path).unwrap();

    let loaded = load_config(&CliOverrides::default(), Some(path)).unwrap();
    assert_eq!(loaded.history_window, 6);
    assert_eq!(loaded.quota_exempt_callers, vec!["lab-admin".to_string()]);
}

#[test]
fn test_custom_tier_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "default_tier": "academic",
            "providers": [
                {"id": "ollama", "priority": 1, "max_retries": 0, "per_attempt_timeout_ms": 5000}
            ],
            "tiers": [
                {
                    "name": "academic",
                    "max_queries_per_period": -1,
                    "max_file_size_mb": 20,
                    "allowed_providers": ["ollama"],
                    "allowed_features": ["pcr_analysis", "sequence_analysis", "file_upload"]
                }
            ]
        }"#,
    )
    .unwrap();

    let config = load_config(&CliOverrides::default(), Some(path)).unwrap();
    let ctx = config.request_context("student", None).unwrap();

    assert_eq!(ctx.tier.name, "academic");
    assert_eq!(ctx.tier.max_queries_per_period, QueryQuota::Unlimited);
    assert!(ctx.tier.allows_feature(FeatureFlag::PcrAnalysis));
    assert!(!ctx.tier.allows_feature(FeatureFlag::CrisprDesign));
    assert_eq!(ctx.providers.len(), 1);
    assert_eq!(ctx.providers[0].id, ProviderId::new("ollama"));
    assert!(ctx.providers[0].enabled);
    assert_eq!(ctx.providers[0].per_attempt_timeout.as_millis(), 5000);
}

#[test]
fn test_tier_with_unknown_provider_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "providers": [{"id": "openai", "priority": 1}],
            "tiers": [
                {"name": "free", "max_queries_per_period": 5, "max_file_size_mb": 1,
                 "allowed_providers": ["anthropic"], "allowed_features": []}
            ]
        }"#,
    )
    .unwrap();

    let err = load_config(&CliOverrides::default(), Some(path)).unwrap_err();
    assert!(format!("{err:#}").contains("anthropic"));
}

#[test]
fn test_negative_quota_other_than_unlimited_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"tiers": [{"name": "free", "max_queries_per_period": -5, "max_file_size_mb": 1,
             "allowed_providers": [], "allowed_features": []}]}"#,
    )
    .unwrap();

    assert!(load_config(&CliOverrides::default(), Some(path)).is_err());
}

#[test]
fn test_cli_pam_override() {
    let temp_dir = TempDir::new().unwrap();
    let overrides = CliOverrides {
        guide_pam: Some("TTTV".to_string()),
        ..CliOverrides::default()
    };
    let config = load_config(&overrides, Some(temp_dir.path().join("missing.json"))).unwrap();
    assert_eq!(config.analyzer().pam(), "TTTV");
}
