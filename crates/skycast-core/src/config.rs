use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `search.api_key`
pub const API_KEY_ENV: &str = "SKYCAST_OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// City shown at the top of the search overlay
    #[serde(default = "default_current_city")]
    pub current_city: String,

    /// City search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Local persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Geocoding and debounce settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// OpenWeather API key; searches return nothing while unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Direct geocoding endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Locale used for `lang` and the localized-name lookup
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Maximum number of cities returned per search
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Quiet period after the last keystroke before a lookup fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Timeout for a single geocoding request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Drop candidates that have no name in `locale`
    #[serde(default = "default_require_localized_name")]
    pub require_localized_name: bool,
}

fn default_current_city() -> String {
    "Москва".to_string()
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/geo/1.0/direct".to_string()
}

fn default_locale() -> String {
    "ru".to_string()
}

fn default_result_limit() -> usize {
    5
}

fn default_debounce_ms() -> u64 {
    1500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_require_localized_name() -> bool {
    true
}

impl SearchConfig {
    /// Check if an API key is configured (not empty or a placeholder)
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(str::trim)
            .is_some_and(|k| !k.is_empty() && !k.starts_with("YOUR_"))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            locale: default_locale(),
            result_limit: default_result_limit(),
            debounce_ms: default_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            require_localized_name: default_require_localized_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding favorites and history files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            current_city: default_current_city(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context("Failed to read config file")?;

            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            config
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.search.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()))
                .context("Configuration validation failed");
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.search.base_url, "search.base_url", &mut result);

        if self.search.locale.trim().is_empty() {
            result.add_error("search.locale", "Locale must not be empty");
        }

        if self.search.result_limit == 0 {
            result.add_error("search.result_limit", "Result limit must be greater than 0");
        } else if self.search.result_limit > 50 {
            result.add_error("search.result_limit", "Result limit must be at most 50");
        }

        if self.search.request_timeout_secs == 0 {
            result.add_error(
                "search.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.search.debounce_ms > 10_000 {
            result.add_warning(
                "search.debounce_ms",
                "Search delay is more than 10 seconds",
            );
        }

        // Missing key is not fatal: searches simply come back empty
        if !self.search.has_api_key() {
            result.add_warning(
                "search.api_key",
                format!("API key not configured - set it here or via {API_KEY_ENV}"),
            );
        }

        if self.current_city.trim().is_empty() {
            result.add_warning("current_city", "Current city is empty");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
