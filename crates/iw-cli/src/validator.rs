//! Configuration validation for IdP Warden.
//!
//! Runs before any pipeline component is built, so a bad threshold or URL is
//! reported up front instead of surfacing halfway through a batch.

use crate::config::AppConfig;
use colored::Colorize;
use iw_core::PromotionPolicy;
use iw_observability::logging::parse_level;
use serde::Serialize;

/// Result of configuration validation.
#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    /// Problems that prevent a run.
    pub errors: Vec<String>,
    /// Problems worth fixing that do not prevent a run.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before a run.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_detection(config, &mut result);
        Self::validate_promotion(config, &mut result);
        Self::validate_commands(config, &mut result);
        Self::validate_llm(config, &mut result);
        Self::validate_paths(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_detection(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = config.detection.validate() {
            result.add_error(format!("detection: {}", e));
        }
    }

    fn validate_promotion(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = PromotionPolicy::new(config.promotion.threshold) {
            result.add_error(format!("promotion: {}", e));
        }
    }

    fn validate_commands(config: &AppConfig, result: &mut ValidationResult) {
        if !is_http_url(&config.commands.base_url) {
            result.add_error(format!(
                "commands.base_url must be an http(s) URL, got '{}'",
                config.commands.base_url
            ));
        } else if config.commands.base_url.contains("example.okta.com") {
            result.add_warning(
                "commands.base_url is the placeholder org; set OKTA_ORG_URL for usable commands",
            );
        }
    }

    fn validate_llm(config: &AppConfig, result: &mut ValidationResult) {
        let llm = &config.llm;

        if !is_http_url(&llm.base_url) {
            result.add_error(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                llm.base_url
            ));
        }
        if llm.model.trim().is_empty() {
            result.add_error("llm.model is empty");
        }
        if llm.timeout_secs == 0 {
            result.add_error("llm.timeout_secs must be greater than zero");
        }
        if llm.api_key.is_empty() && !is_local(&llm.base_url) {
            result.add_warning(format!(
                "No API key configured for remote LLM endpoint {}. Set LLM_API_KEY.",
                llm.base_url
            ));
        }
    }

    fn validate_paths(config: &AppConfig, result: &mut ValidationResult) {
        if !config.source.events_path.exists() {
            result.add_warning(format!(
                "Event file not found: {}. Runs will process an empty batch.",
                config.source.events_path.display()
            ));
        }
        if config.storage.data_dir.is_file() {
            result.add_error(format!(
                "storage.data_dir is a file: {}",
                config.storage.data_dir.display()
            ));
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if parse_level(&config.logging.level).is_none() {
            result.add_error(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error",
                config.logging.level
            ));
        }
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

fn is_local(url: &str) -> bool {
    ["://localhost", "://127.0.0.1", "://[::1]"]
        .iter()
        .any(|marker| url.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iw_connectors::SecureString;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.commands.base_url = "https://acme.okta.com".into();
        config.source.events_path = std::env::temp_dir();
        config
    }

    #[test]
    fn test_default_local_config_is_valid() {
        let result = ConfigValidator::validate(&valid_config());
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_bad_thresholds_are_errors() {
        let mut config = valid_config();
        config.detection.burst_threshold = 0;
        config.promotion.threshold = 1.5;
        let result = ConfigValidator::validate(&config);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("detection"));
        assert!(result.errors[1].starts_with("promotion"));
    }

    #[test]
    fn test_bad_urls_are_errors() {
        let mut config = valid_config();
        config.commands.base_url = "acme.okta.com".into();
        config.llm.base_url = "https://".into();
        let result = ConfigValidator::validate(&config);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_remote_llm_without_key_warns() {
        let mut config = valid_config();
        config.llm.base_url = "https://api.openai.com/v1".into();
        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 1);

        config.llm.api_key = SecureString::from("sk-live");
        assert!(!ConfigValidator::validate(&config).has_warnings());
    }

    #[test]
    fn test_placeholder_org_and_missing_events_warn() {
        let mut config = AppConfig::default();
        config.source.events_path = "/nonexistent/events.json".into();
        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = valid_config();
        config.logging.level = "chatty".into();
        assert!(ConfigValidator::validate(&config).has_errors());
    }
}
