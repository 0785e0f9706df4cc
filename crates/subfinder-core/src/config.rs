use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// This gets loaded from the config file, then the CLI overrides what it needs.
/// Every field has a default so a half-written file still loads.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Load config from default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> crate::Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> crate::Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux, Application Support on macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("subfinder");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding products and favorites
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("subfinder"))
        .unwrap_or_default()
        .join("catalog.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// OpenFoodFacts server (world.openfoodfacts.net for staging)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Products per request; the server times out on big pages
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Only categories tagged with this language are kept
    #[serde(default = "default_category_language")]
    pub category_language: String,

    /// Each sync asks for this many times the current catalog size
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,

    /// Target used while the catalog is still small or empty
    #[serde(default = "default_initial_target")]
    pub initial_target: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries per page on timeouts and 5xx, 0 means fail the run right away
    #[serde(default)]
    pub max_retries: u32,
}

fn default_api_url() -> String {
    subfinder_api::OPENFOODFACTS_API_BASE.to_string()
}

fn default_page_size() -> u32 {
    500
}

fn default_category_language() -> String {
    "en".to_string()
}

fn default_growth_factor() -> f64 {
    1.3 // refresh everything we have and grow by roughly a third
}

fn default_initial_target() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            page_size: default_page_size(),
            category_language: default_category_language(),
            growth_factor: default_growth_factor(),
            initial_target: default_initial_target(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How many products a search or substitute list shows
    #[serde(default = "default_results_limit")]
    pub results_limit: usize,
}

fn default_results_limit() -> usize {
    12
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            results_limit: default_results_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.results_limit, 12);
        assert_eq!(config.sync.page_size, 500);
        assert_eq!(config.sync.category_language, "en");
        assert_eq!(config.sync.max_retries, 0);
        assert!(config.database.path.ends_with("catalog.db"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("growth_factor"));
        assert!(toml.contains("results_limit"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            page_size = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.page_size, 100);
        assert_eq!(config.sync.initial_target, 1000);
        assert_eq!(config.display.results_limit, 12);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subfinder").join("config.toml");

        let mut config = Config::default();
        config.sync.api_url = "https://world.openfoodfacts.net".to_string();
        config.display.results_limit = 6;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.sync.api_url, "https://world.openfoodfacts.net");
        assert_eq!(loaded.display.results_limit, 6);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sync.growth_factor, 1.3);
    }

    #[test]
    fn test_broken_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\npage_size = ").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(crate::Error::ConfigError(_))));
    }
}
