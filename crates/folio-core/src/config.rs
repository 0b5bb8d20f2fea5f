//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/folio/config.toml)
//! 3. Environment variables (FOLIO_* prefix)
//!
//! Environment variables take precedence over config file values. The
//! result is resolved once at startup and passed around by value; nothing
//! re-reads it mid-session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::local::VersionPolicy;

/// Environment variable prefix
const ENV_PREFIX: &str = "FOLIO";

/// Default name of the remote post table
const DEFAULT_REMOTE_TABLE: &str = "blog_posts";

/// Which key-value backend holds the local store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalBackendKind {
    /// One JSON file per key
    #[default]
    File,
    /// A single SQLite database
    Sqlite,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (posts, version marker, backups)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Use the remote post table instead of the local store
    #[serde(default)]
    pub use_remote: bool,

    /// Serve reads from the local store when a remote read fails
    #[serde(default = "default_true")]
    pub fallback_to_local: bool,

    /// Base URL of the remote service (e.g. https://xyz.supabase.co)
    #[serde(default)]
    pub remote_url: Option<String>,

    /// API key sent with every remote request
    #[serde(default)]
    pub remote_key: Option<String>,

    /// Name of the remote post table
    #[serde(default = "default_remote_table")]
    pub remote_table: String,

    /// Bearer token of the signed-in caller
    #[serde(default)]
    pub access_token: Option<String>,

    /// Local operator name, used as the caller when no remote session exists
    #[serde(default)]
    pub operator: Option<String>,

    /// Key-value backend for the local store
    #[serde(default)]
    pub local_backend: LocalBackendKind,

    /// What to do with local data written under an older schema version
    #[serde(default)]
    pub on_version_mismatch: VersionPolicy,

    /// Log level for folio crates (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            use_remote: false,
            fallback_to_local: true,
            remote_url: None,
            remote_key: None,
            remote_table: default_remote_table(),
            access_token: None,
            operator: None,
            local_backend: LocalBackendKind::default(),
            on_version_mismatch: VersionPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FOLIO_DATA_DIR, FOLIO_USE_REMOTE, ...)
    /// 2. Config file (~/.config/folio/config.toml or FOLIO_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit config path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = env_var("USE_REMOTE") {
            self.use_remote = parse_bool(&val);
        }
        if let Some(val) = env_var("FALLBACK_TO_LOCAL") {
            self.fallback_to_local = parse_bool(&val);
        }
        if let Some(val) = env_var("REMOTE_URL") {
            self.remote_url = non_empty(val);
        }
        if let Some(val) = env_var("REMOTE_KEY") {
            self.remote_key = non_empty(val);
        }
        if let Some(val) = env_var("ACCESS_TOKEN") {
            self.access_token = non_empty(val);
        }
        if let Some(val) = env_var("OPERATOR") {
            self.operator = non_empty(val);
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Whether the remote backend is requested and has a URL and key to reach it
    pub fn remote_enabled(&self) -> bool {
        self.use_remote && self.remote_url.is_some() && self.remote_key.is_some()
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FOLIO_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("config.toml")
    }

    /// Get the path to the SQLite database used by the sqlite local backend
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("folio.db")
    }

    /// Default directory for downloadable backup artifacts
    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
}

fn default_true() -> bool {
    true
}

fn default_remote_table() -> String {
    DEFAULT_REMOTE_TABLE.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "FOLIO_DATA_DIR",
        "FOLIO_USE_REMOTE",
        "FOLIO_FALLBACK_TO_LOCAL",
        "FOLIO_REMOTE_URL",
        "FOLIO_REMOTE_KEY",
        "FOLIO_ACCESS_TOKEN",
        "FOLIO_OPERATOR",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.use_remote);
        assert!(config.fallback_to_local);
        assert!(config.remote_url.is_none());
        assert_eq!(config.remote_table, "blog_posts");
        assert_eq!(config.local_backend, LocalBackendKind::File);
        assert_eq!(config.on_version_mismatch, VersionPolicy::Discard);
        assert!(config.data_dir.ends_with("folio"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.sqlite_path().ends_with("folio.db"));
        assert!(config.backup_dir().ends_with("backups"));
    }

    #[test]
    fn test_remote_enabled_requires_url_and_key() {
        let mut config = Config {
            use_remote: true,
            ..Config::default()
        };
        assert!(!config.remote_enabled());

        config.remote_url = Some("https://example.supabase.co".to_string());
        assert!(!config.remote_enabled());

        config.remote_key = Some("anon-key".to_string());
        assert!(config.remote_enabled());

        config.use_remote = false;
        assert!(!config.remote_enabled());
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FOLIO_DATA_DIR", "/tmp/folio-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/folio-test"));
    }

    #[test]
    fn test_env_override_flags() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FOLIO_USE_REMOTE", "TRUE");
        env::set_var("FOLIO_FALLBACK_TO_LOCAL", "0");
        config.apply_env_overrides();
        assert!(config.use_remote);
        assert!(!config.fallback_to_local);

        env::set_var("FOLIO_USE_REMOTE", "1");
        env::set_var("FOLIO_FALLBACK_TO_LOCAL", "true");
        config.use_remote = false;
        config.apply_env_overrides();
        assert!(config.use_remote);
        assert!(config.fallback_to_local);
    }

    #[test]
    fn test_env_override_remote_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("FOLIO_REMOTE_URL", "https://example.supabase.co");
        config.apply_env_overrides();
        assert_eq!(
            config.remote_url,
            Some("https://example.supabase.co".to_string())
        );

        // Empty string clears it
        env::set_var("FOLIO_REMOTE_URL", "");
        config.apply_env_overrides();
        assert!(config.remote_url.is_none());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/folio"),
            use_remote: true,
            remote_url: Some("https://example.supabase.co".to_string()),
            local_backend: LocalBackendKind::Sqlite,
            on_version_mismatch: VersionPolicy::Preserve,
            ..Config::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("use_remote"));
        assert!(toml_str.contains("local_backend = \"sqlite\""));
        assert!(toml_str.contains("on_version_mismatch = \"preserve\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.remote_url, config.remote_url);
        assert_eq!(parsed.local_backend, LocalBackendKind::Sqlite);
        assert_eq!(parsed.on_version_mismatch, VersionPolicy::Preserve);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            use_remote = true
            fallback_to_local = false
            remote_url = "https://example.supabase.co"
            remote_key = "anon"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert!(config.use_remote);
        assert!(!config.fallback_to_local);
        assert_eq!(config.remote_key.as_deref(), Some("anon"));
        assert_eq!(config.remote_table, "blog_posts");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("FOLIO_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();

        assert!(!config.use_remote);
        assert!(config.remote_url.is_none());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_to_path_roundtrip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            operator: Some("editor".to_string()),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.operator.as_deref(), Some("editor"));
        assert_eq!(loaded.data_dir, config.data_dir);
    }
}
