use crate::errors::{CurioError, CurioResult};
use crate::types::{Model, SearchRecency};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for a Curio session
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CurioConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: Model,
    pub temperature: f32,
    pub search_recency: SearchRecency,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Rewrite `[n]` markers into links to the matching search result
    pub link_citations: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Default for CurioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Model::default(),
            temperature: DEFAULT_TEMPERATURE,
            search_recency: SearchRecency::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            link_citations: false,
            log_level: None,
        }
    }
}

/// Values supplied on top of the config file, e.g. from flags or the environment.
/// `None` keeps whatever the file said.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub model: Option<Model>,
    pub temperature: Option<f32>,
    pub search_recency: Option<SearchRecency>,
    pub link_citations: Option<bool>,
    pub log_level: Option<String>,
}

impl CurioConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> CurioResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;

            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> CurioResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            CurioError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;

        Ok(())
    }

    /// Writes `api_key` into the file at `path`, keeping every other value the file
    /// already holds (or the defaults when there is no file yet)
    pub fn store_api_key(path: &Path, api_key: &str) -> CurioResult<()> {
        let mut on_disk = Self::load_from_file(path)?;
        on_disk.api_key = Some(api_key.trim().to_string());
        on_disk.save_to_file(path)
    }

    /// Applies overrides on top of this config, preferring values from the overrides if present
    pub fn merge(&self, overrides: &ConfigOverrides) -> Self {
        Self {
            api_key: overrides
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .or_else(|| self.api_key.clone()),
            model: overrides.model.unwrap_or(self.model),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            search_recency: overrides.search_recency.unwrap_or(self.search_recency),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
            link_citations: overrides.link_citations.unwrap_or(self.link_citations),
            log_level: overrides
                .log_level
                .clone()
                .or_else(|| self.log_level.clone()),
        }
    }

    pub fn validate(&self) -> CurioResult<()> {
        validate_temperature(self.temperature)?;
        if self.timeout_secs == 0 {
            return Err(CurioError::ConfigError(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(CurioError::ConfigError("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// The API key, if one is set and not blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Like [`CurioConfig::api_key`], but a missing key is an error
    pub fn require_api_key(&self) -> CurioResult<&str> {
        self.api_key().ok_or(CurioError::MissingApiKey)
    }

    pub fn set_temperature(&mut self, temperature: f32) -> CurioResult<()> {
        validate_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }
}

fn validate_temperature(temperature: f32) -> CurioResult<()> {
    if !(0.0..=1.0).contains(&temperature) {
        return Err(CurioError::ConfigError(format!(
            "temperature must be between 0.0 and 1.0, got {}",
            temperature
        )));
    }
    Ok(())
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> CurioResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        CurioError::ConfigError("Could not determine home directory".to_string())
    })?;

    let config_dir = home_dir.join(".config").join(app_name);

    Ok(config_dir)
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> CurioResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
