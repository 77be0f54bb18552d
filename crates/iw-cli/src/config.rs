//! Configuration loading for the IdP Warden CLI.

use anyhow::{bail, Context, Result};
use iw_connectors::{LlmConfig, SecureString};
use iw_core::{DetectionConfig, DEFAULT_PROMOTION_THRESHOLD};
use iw_observability::LogFormat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables that override file values.
pub const ENV_ORG_URL: &str = "OKTA_ORG_URL";
pub const ENV_LLM_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub promotion: PromotionConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Loads configuration from a YAML file, falling back to defaults when it does not exist.
    ///
    /// `${VAR}` references are expanded before parsing, and the well-known
    /// environment overrides are applied afterwards.
    pub fn load(path: &Path) -> Result<Self> {
        let lookup = |name: &str| std::env::var(name).ok();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&contents, lookup)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Parses YAML after expanding `${VAR}` references through `lookup`.
    pub fn parse(contents: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let expanded = substitute_env_vars(contents, lookup)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Applies `OKTA_ORG_URL`, `LLM_BASE_URL`, `LLM_MODEL` and `LLM_API_KEY`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_blank(ENV_ORG_URL) {
            self.commands.base_url = url;
        }
        if let Some(url) = non_blank(ENV_LLM_BASE_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = non_blank(ENV_LLM_MODEL) {
            self.llm.model = model;
        }
        if let Some(key) = non_blank(ENV_LLM_API_KEY) {
            self.llm.api_key = SecureString::new(key);
        }
    }
}

/// Replaces `${VAR_NAME}` patterns with values from `lookup`.
///
/// Every unresolved name is reported in a single error.
pub fn substitute_env_vars(
    input: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")?;
    let mut missing = Vec::new();

    let result = re.replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        bail!("Environment variable(s) not set: {}", missing.join(", "));
    }
    Ok(result.into_owned())
}

/// Promotion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_PROMOTION_THRESHOLD
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Command template settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandsConfig {
    /// Identity-provider org URL used in rendered commands.
    #[serde(default = "default_org_url")]
    pub base_url: String,
}

fn default_org_url() -> String {
    "https://example.okta.com".to_string()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            base_url: default_org_url(),
        }
    }
}

/// Record log location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// System Log export location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "default_events_path")]
    pub events_path: PathBuf,
}

fn default_events_path() -> PathBuf {
    PathBuf::from("demo/system_log.json")
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            events_path: default_events_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}
