use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Server URL (e.g., "http://localhost:8080" or "https://sync.example.com")
    pub server_url: Option<String>,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Enable automatic sync around commands (default: false)
    #[serde(default)]
    pub auto_sync: bool,
}

impl SyncConfig {
    /// Returns true if sync is configured (has both server_url and api_key)
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Directory holding the pending-operation queue and cache
    pub data_dir: ConfigValue<PathBuf>,
    /// Default user name for new entries
    pub created_by: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Sync configuration
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    created_by: Option<String>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_data_dir = Self::default_data_dir();
        let default_db_path = default_data_dir.join("stitch.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut data_dir = ConfigValue::new(default_data_dir, ConfigSource::Default);
        let mut created_by = ConfigValue::new("default".to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path =
                    ConfigValue::new(resolve_relative(&path, db_path), ConfigSource::File);
            }
            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(user) = file_config.created_by {
                created_by = ConfigValue::new(user, ConfigSource::File);
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("STITCH_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("STITCH_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(user) = std::env::var("STITCH_CREATED_BY") {
            created_by = ConfigValue::new(user, ConfigSource::Environment);
        }
        // Sync env var overrides
        if let Ok(url) = std::env::var("STITCH_SYNC_URL") {
            sync.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("STITCH_SYNC_API_KEY") {
            sync.api_key = Some(key);
        }

        Ok(Self {
            database_path,
            data_dir,
            created_by,
            config_file,
            sync,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/stitchkit/
    /// - macOS: ~/Library/Application Support/stitchkit/
    /// - Windows: %APPDATA%/stitchkit/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stitchkit")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/stitchkit/
    /// - macOS: ~/Library/Application Support/stitchkit/
    /// - Windows: %APPDATA%/stitchkit/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stitchkit")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Queue file for mutations awaiting sync.
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.value.join("pending-ops.json")
    }

    /// Directory for cached collections.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.value.join("cache")
    }
}

/// Resolve relative paths against the config file's directory.
fn resolve_relative(config_path: &std::path::Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.created_by.value, "default");
        assert!(config.config_file.is_none());
        assert!(!config.sync.is_configured());
    }

    #[test]
    fn test_config_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "created_by: erin").unwrap();
        writeln!(file, "database_path: stash.db").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  server_url: \"http://localhost:8080\"").unwrap();
        writeln!(file, "  api_key: \"secret\"").unwrap();
        writeln!(file, "  auto_sync: true").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.created_by.value, "erin");
        assert_eq!(config.created_by.source, ConfigSource::File);
        // Relative paths resolve against the config file's directory.
        assert_eq!(config.database_path.value, temp_dir.path().join("stash.db"));
        assert_eq!(config.config_file, Some(config_path));
        assert!(config.sync.is_configured());
        assert!(config.sync.auto_sync);
    }

    #[test]
    fn test_data_dir_layout() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: data").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        let data_dir = temp_dir.path().join("data");
        assert_eq!(config.queue_path(), data_dir.join("pending-ops.json"));
        assert_eq!(config.cache_dir(), data_dir.join("cache"));
    }

    #[test]
    fn test_sync_config_requires_both_fields() {
        let sync = SyncConfig {
            server_url: Some("http://localhost:8080".to_string()),
            api_key: None,
            auto_sync: false,
        };
        assert!(!sync.is_configured());
    }
}
