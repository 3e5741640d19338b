//! Configuration management for wcgate.
//!
//! Parses `wcgate.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Every section is
//! optional, so a deployment can run without any file at all and take its
//! upstream credentials from the environment.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `upstream.base_url` (default `${WC_URL}`)
//! - `upstream.consumer_key` (default `${WC_CONSUMER_KEY}`)
//! - `upstream.consumer_secret` (default `${WC_CONSUMER_SECRET}`)
//! - `cors.allowed_origin` (default `${WC_ALLOWED_ORIGIN:-http://localhost:3000}`)

mod expand;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the CORS allowed origin.
    pub allowed_origin: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wcgate.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Upstream API configuration.
    pub upstream: UpstreamConfig,
    /// CORS configuration.
    pub cors: CorsConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8787,
        }
    }
}

/// Upstream REST API configuration.
#[derive(Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Store base URL, e.g. `https://shop.example.com`.
    pub base_url: String,
    /// OAuth consumer key.
    pub consumer_key: String,
    /// OAuth consumer secret.
    pub consumer_secret: String,
    /// Path between the base URL and the resource.
    pub api_prefix: String,
    /// Timeout for the whole upstream call. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "${WC_URL}".to_owned(),
            consumer_key: "${WC_CONSUMER_KEY}".to_owned(),
            consumer_secret: "${WC_CONSUMER_SECRET}".to_owned(),
            api_prefix: "wp-json/wc/v3".to_owned(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("api_prefix", &self.api_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl UpstreamConfig {
    /// Root URL all resources hang off, e.g. `https://shop.example.com/wp-json/wc/v3`.
    #[must_use]
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_owned()
        } else {
            format!("{base}/{prefix}")
        }
    }
}

/// CORS configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "${WC_ALLOWED_ORIGIN:-http://localhost:3000}".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`upstream.consumer_secret`").
        field: String,
        /// Error message (e.g., "${`WC_CONSUMER_SECRET`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `wcgate.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// Environment variables are expanded before CLI settings are applied, so
    /// CLI values are taken literally. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// a referenced environment variable is unset, or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        config.expand_env_vars()?;

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(origin) = &settings.allowed_origin {
            self.cors.allowed_origin.clone_from(origin);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_upstream()?;
        require_non_empty(&self.cors.allowed_origin, "cors.allowed_origin")?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 would bind a random port nobody can find
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate upstream configuration.
    fn validate_upstream(&self) -> Result<(), ConfigError> {
        let upstream = &self.upstream;
        require_non_empty(&upstream.base_url, "upstream.base_url")?;
        require_http_url(&upstream.base_url, "upstream.base_url")?;
        if upstream.base_url.contains('?') {
            return Err(ConfigError::Validation(
                "upstream.base_url cannot contain a query string".to_owned(),
            ));
        }
        require_non_empty(&upstream.consumer_key, "upstream.consumer_key")?;
        require_non_empty(&upstream.consumer_secret, "upstream.consumer_secret")?;
        if upstream.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "upstream.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        let upstream = &mut self.upstream;
        upstream.base_url = expand::expand_env(&upstream.base_url, "upstream.base_url")?;
        upstream.consumer_key =
            expand::expand_env(&upstream.consumer_key, "upstream.consumer_key")?;
        upstream.consumer_secret =
            expand::expand_env(&upstream.consumer_secret, "upstream.consumer_secret")?;

        self.cors.allowed_origin =
            expand::expand_env(&self.cors.allowed_origin, "cors.allowed_origin")?;

        Ok(())
    }
}
