use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::schema::Config;

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

/// Values given on the command line. They take precedence over everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub default_tier: Option<String>,
    pub guide_pam: Option<String>,
}

/// Loads configuration in layers: defaults, then the config file
/// (`~/.biomind/config.json` or `cli_config_path`), then `BIOMIND_*`
/// environment variables, then CLI flags. The result is validated.
pub fn load_config(overrides: &CliOverrides, cli_config_path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    // Layer 1: config file
    let config_file = cli_config_path.or_else(get_default_config_path);
    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = read_config_file(path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    // Layer 2: environment
    merge_env_variables(&mut config);

    // Layer 3: CLI flags
    if let Some(ref tier) = overrides.default_tier {
        tracing::debug!(tier = %tier, "Applying CLI tier override");
        config.default_tier = tier.clone();
    }
    if let Some(ref pam) = overrides.guide_pam {
        tracing::debug!(pam = %pam, "Applying CLI PAM override");
        config.guide_pam = pam.clone();
    }

    config.validate().context("Invalid configuration")?;

    tracing::debug!(
        default_tier = %config.default_tier,
        history_window = config.history_window,
        session_idle_minutes = config.session_idle_minutes,
        guide_pam = %config.guide_pam,
        providers = config.providers.len(),
        tiers = config.tiers.len(),
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".biomind").join("config.json"))
}

fn read_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| {
        format!(
            "Configuration file {} contains invalid JSON",
            path.display()
        )
    })
}

fn merge_env_variables(config: &mut Config) {
    if let Some(tier) = env_string("BIOMIND_DEFAULT_TIER") {
        config.default_tier = tier;
    }
    if let Some(window) = env_parsed::<usize>("BIOMIND_HISTORY_WINDOW") {
        config.history_window = window;
    }
    if let Some(minutes) = env_parsed::<u64>("BIOMIND_SESSION_IDLE_MINUTES") {
        config.session_idle_minutes = minutes;
    }
    if let Some(pam) = env_string("BIOMIND_PAM") {
        config.guide_pam = pam.to_ascii_uppercase();
    }
}

/// Non-empty, trimmed value of an environment variable
fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    tracing::info!(config_path = %path.display(), "Configuration saved");
    Ok(())
}

pub fn get_config_path() -> Option<PathBuf> {
    get_default_config_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 4] = [
        "BIOMIND_DEFAULT_TIER",
        "BIOMIND_HISTORY_WINDOW",
        "BIOMIND_SESSION_IDLE_MINUTES",
        "BIOMIND_PAM",
    ];

    fn clear_env() {
        unsafe {
            for var in ENV_VARS {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_load_config_defaults() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();

        let config = load_config(
            &CliOverrides::default(),
            Some(temp_dir.path().join("nonexistent.json")),
        )
        .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let file_config = Config {
            history_window: 3,
            default_tier: "pro".to_string(),
            ..Config::default()
        };
        save_config(&file_config, &config_path).unwrap();

        let loaded = load_config(&CliOverrides::default(), Some(config_path)).unwrap();
        assert_eq!(loaded.history_window, 3);
        assert_eq!(loaded.default_tier, "pro");
    }

    #[test]
    fn test_load_config_invalid_json() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "not valid json").unwrap();

        let err = load_config(&CliOverrides::default(), Some(config_path)).unwrap_err();
        assert!(format!("{err:#}").contains("invalid JSON"));
    }

    #[test]
    fn test_config_hierarchy_precedence() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        // Layer 1: file
        let file_config = Config {
            history_window: 3,
            session_idle_minutes: 15,
            guide_pam: "NAG".to_string(),
            ..Config::default()
        };
        save_config(&file_config, &config_path).unwrap();

        // Layer 2: env
        unsafe {
            env::set_var("BIOMIND_HISTORY_WINDOW", "7");
            env::set_var("BIOMIND_PAM", "ngg");
            env::set_var("BIOMIND_DEFAULT_TIER", "pro");
        }

        // Layer 3: CLI
        let overrides = CliOverrides {
            default_tier: Some("enterprise".to_string()),
            guide_pam: None,
        };
        let config = load_config(&overrides, Some(config_path)).unwrap();

        assert_eq!(config.session_idle_minutes, 15); // file
        assert_eq!(config.history_window, 7); // env
        assert_eq!(config.guide_pam, "NGG"); // env
        assert_eq!(config.default_tier, "enterprise"); // CLI

        clear_env();
    }

    #[test]
    fn test_unparsable_env_is_ignored() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("BIOMIND_HISTORY_WINDOW", "lots");
        }
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(
            &CliOverrides::default(),
            Some(temp_dir.path().join("none.json")),
        )
        .unwrap();
        assert_eq!(config.history_window, Config::default().history_window);
        clear_env();
    }

    #[test]
    fn test_invalid_layered_result_is_rejected() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let overrides = CliOverrides {
            default_tier: Some("platinum".to_string()),
            guide_pam: None,
        };
        let err = load_config(&overrides, Some(temp_dir.path().join("none.json"))).unwrap_err();
        assert!(format!("{err:#}").contains("platinum"));
    }

    #[test]
    fn test_oversized_idle_minutes_from_env_is_rejected() {
        let _lock = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("BIOMIND_SESSION_IDLE_MINUTES", "1152921504606846976");
        }
        let temp_dir = TempDir::new().unwrap();
        let err = load_config(
            &CliOverrides::default(),
            Some(temp_dir.path().join("none.json")),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("session_idle_minutes"));
        clear_env();
    }

    #[test]
    fn test_get_config_path() {
        let path = get_config_path().unwrap();
        assert!(path.to_string_lossy().contains(".biomind"));
        assert!(path.to_string_lossy().ends_with("config.json"));
    }
}
