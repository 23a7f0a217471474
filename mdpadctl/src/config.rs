//! CLI configuration management
//!
//! Resolves the server URL, config directory, and cookie-file path from
//! a priority chain: defaults → config file → environment variables →
//! CLI arguments (highest).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the server base URL.
pub const ENV_SERVER: &str = "MDPAD_SERVER";
/// Environment variable overriding the config directory.
pub const ENV_CONFIG_DIR: &str = "MDPAD_CONFIG_DIR";
/// Environment variable overriding the cookie-file path.
pub const ENV_COOKIE_FILE: &str = "MDPAD_COOKIE_FILE";
/// Environment variable enabling verbose output.
pub const ENV_VERBOSE: &str = "MDPAD_VERBOSE";

/// Resolved CLI configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Server base URL, trailing slash normalized away
    pub server_url: String,

    /// Directory holding config.toml and, by default, the cookie file
    pub config_dir: PathBuf,

    /// Path of the persisted session cookie file
    pub cookie_file: PathBuf,

    /// Enable verbose logging
    pub verbose: bool,
}

/// On-disk settings (`<config_dir>/config.toml`). Every field is
/// optional; missing values fall through the priority chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FileConfig {
    server_url: Option<String>,
    cookie_file: Option<PathBuf>,
    verbose: Option<bool>,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdpad")
}

impl Default for CliConfig {
    fn default() -> Self {
        let config_dir = default_config_dir();
        let cookie_file = config_dir.join("cookies.json");
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            config_dir,
            cookie_file,
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Path of the config file inside the config directory.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

/// Builder for CLI configuration with validation and priority chain
/// support.
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// The `with_*` setters overwrite; `with_env_overrides` and
/// `with_config_file` only fill values not already set, so callers
/// apply env before file to give the environment the higher priority.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    server_url: Option<String>,
    config_dir: Option<PathBuf>,
    cookie_file: Option<PathBuf>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL (with validation)
    pub fn with_server_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        Self::validate_url(&url)?;
        self.server_url = Some(url);
        Ok(self)
    }

    /// Set the config directory
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Set the cookie-file path
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Apply environment variable overrides for values not already set.
    pub fn with_env_overrides(mut self) -> Self {
        if self.config_dir.is_none() {
            if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
                if !dir.is_empty() {
                    self.config_dir = Some(PathBuf::from(dir));
                }
            }
        }

        if self.server_url.is_none() {
            if let Ok(server_url) = std::env::var(ENV_SERVER) {
                if Self::validate_url(&server_url).is_ok() {
                    self.server_url = Some(server_url);
                }
            }
        }

        if self.cookie_file.is_none() {
            if let Ok(path) = std::env::var(ENV_COOKIE_FILE) {
                if !path.is_empty() {
                    self.cookie_file = Some(PathBuf::from(path));
                }
            }
        }

        if self.verbose.is_none() {
            if let Ok(verbose) = std::env::var(ENV_VERBOSE) {
                self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
            }
        }

        self
    }

    /// Load `<config_dir>/config.toml`, filling values not already set.
    ///
    /// A missing file is fine; an unreadable or malformed file is an
    /// error, since silently ignoring it would mask typos.
    pub fn with_config_file(mut self, load_file: bool) -> Result<Self> {
        if !load_file {
            return Ok(self);
        }

        let dir = self
            .config_dir
            .clone()
            .unwrap_or_else(default_config_dir);
        let path = dir.join("config.toml");
        if !path.exists() {
            return Ok(self);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        self.server_url = self.server_url.or(file.server_url);
        self.cookie_file = self.cookie_file.or(file.cookie_file);
        self.verbose = self.verbose.or(file.verbose);
        Ok(self)
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let server_url = self.server_url.unwrap_or(defaults.server_url);
        Self::validate_url(&server_url)?;

        let config_dir = self.config_dir.unwrap_or(defaults.config_dir);
        let cookie_file = self
            .cookie_file
            .unwrap_or_else(|| config_dir.join("cookies.json"));

        Ok(CliConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            config_dir,
            cookie_file,
            verbose: self.verbose.unwrap_or(defaults.verbose),
        })
    }

    /// Validate URL format
    fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(anyhow::anyhow!("Server URL cannot be empty"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Server URL must start with http:// or https://"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clean_env() {
        std::env::remove_var(ENV_SERVER);
        std::env::remove_var(ENV_CONFIG_DIR);
        std::env::remove_var(ENV_COOKIE_FILE);
        std::env::remove_var(ENV_VERBOSE);
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:3000");
        assert!(!config.verbose);
        assert_eq!(config.cookie_file, config.config_dir.join("cookies.json"));
        assert_eq!(
            config.config_file(),
            config.config_dir.join("config.toml")
        );
    }

    #[test]
    #[serial]
    fn test_builder_with_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_builder_with_custom_values() {
        let config = ConfigBuilder::new()
            .with_server_url("https://pad.example.com:8443")
            .unwrap()
            .with_config_dir("/tmp/mdpad-test")
            .with_cookie_file("/tmp/mdpad-test/jar.json")
            .with_verbose(true)
            .build()
            .unwrap();

        assert_eq!(config.server_url, "https://pad.example.com:8443");
        assert_eq!(config.config_dir, PathBuf::from("/tmp/mdpad-test"));
        assert_eq!(config.cookie_file, PathBuf::from("/tmp/mdpad-test/jar.json"));
        assert!(config.verbose);
    }

    #[test]
    fn test_builder_url_validation() {
        assert!(ConfigBuilder::new().with_server_url("").is_err());
        assert!(ConfigBuilder::new()
            .with_server_url("ftp://example.com")
            .is_err());
        assert!(ConfigBuilder::new()
            .with_server_url("http://localhost:3000")
            .is_ok());
        assert!(ConfigBuilder::new()
            .with_server_url("https://example.com")
            .is_ok());
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let config = ConfigBuilder::new()
            .with_server_url("http://pad.example.com/")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.server_url, "http://pad.example.com");
    }

    #[test]
    #[serial]
    fn test_builder_with_env_overrides() {
        clean_env();
        std::env::set_var(ENV_SERVER, "http://env.example.com:9000");
        std::env::set_var(ENV_CONFIG_DIR, "/tmp/mdpad-env");
        std::env::set_var(ENV_VERBOSE, "true");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        assert_eq!(config.server_url, "http://env.example.com:9000");
        assert_eq!(config.config_dir, PathBuf::from("/tmp/mdpad-env"));
        // Cookie file follows the overridden config dir
        assert_eq!(
            config.cookie_file,
            PathBuf::from("/tmp/mdpad-env/cookies.json")
        );
        assert!(config.verbose);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_cli_args_beat_env() {
        clean_env();
        std::env::set_var(ENV_SERVER, "http://env.example.com:9000");

        let config = ConfigBuilder::new()
            .with_server_url("http://cli.example.com:7000")
            .unwrap()
            .with_env_overrides()
            .build()
            .unwrap();

        assert_eq!(config.server_url, "http://cli.example.com:7000");
        clean_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_url_ignored() {
        clean_env();
        std::env::set_var(ENV_SERVER, "not-a-url");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();
        assert_eq!(config.server_url, "http://127.0.0.1:3000");

        clean_env();
    }

    #[test]
    fn test_config_file_fills_gaps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
server_url = "http://file.example.com"
verbose = true
"#,
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .with_config_dir(dir.path())
            .with_config_file(true)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.server_url, "http://file.example.com");
        assert!(config.verbose);

        // An explicit server URL wins over the file
        let config = ConfigBuilder::new()
            .with_server_url("http://cli.example.com")
            .unwrap()
            .with_config_dir(dir.path())
            .with_config_file(true)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.server_url, "http://cli.example.com");
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "server_url = [42]").unwrap();

        let result = ConfigBuilder::new()
            .with_config_dir(dir.path())
            .with_config_file(true);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_config_skips_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"server_url = "http://file.example.com""#,
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .with_config_dir(dir.path())
            .with_config_file(false)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.server_url, "http://127.0.0.1:3000");
    }
}
