//! Configuration loading and validation
//!
//! Configuration is optional: every field has a default matching the scanner's
//! documented behavior (depth 3, 2000 ms latency threshold, 5 scans per minute
//! per IP, 10 concurrent sessions). A TOML file can override any of them.

mod types;

pub use types::{Config, LimitsConfig, ScanConfig, UserAgentConfig};

use crate::ConfigError;
use std::path::Path;

/// Loads and validates a configuration file
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Validates a configuration, whether loaded or constructed in code
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.scan.max_pages == 0 {
        return Err(ConfigError::Validation(
            "scan.max-pages must be at least 1".to_string(),
        ));
    }

    if config.scan.max_concurrent_fetches == 0 {
        return Err(ConfigError::Validation(
            "scan.max-concurrent-fetches must be at least 1".to_string(),
        ));
    }

    if config.scan.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "scan.fetch-timeout-ms must be nonzero".to_string(),
        ));
    }

    if config.scan.latency_threshold_ms == 0 {
        return Err(ConfigError::Validation(
            "scan.latency-threshold-ms must be nonzero".to_string(),
        ));
    }

    if config.limits.max_active_sessions == 0 {
        return Err(ConfigError::Validation(
            "limits.max-active-sessions must be at least 1".to_string(),
        ));
    }

    if config.limits.scans_per_minute == 0 {
        return Err(ConfigError::Validation(
            "limits.scans-per-minute must be at least 1".to_string(),
        ));
    }

    if config.user_agent.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-name must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.scan.max_depth, 3);
        assert_eq!(config.scan.latency_threshold_ms, 2000);
        assert_eq!(config.limits.scans_per_minute, 5);
        assert_eq!(config.limits.max_active_sessions, 10);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [scan]
            max-depth = 2
            max-pages = 10
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan.max_depth, 2);
        assert_eq!(config.scan.max_pages, 10);
        // Untouched fields keep their defaults
        assert_eq!(config.scan.latency_threshold_ms, 2000);
        assert_eq!(config.limits.max_active_sessions, 10);
    }

    #[test]
    fn test_reject_zero_pages() {
        let mut config = Config::default();
        config.scan.max_pages = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_reject_zero_concurrency() {
        let mut config = Config::default();
        config.scan.max_concurrent_fetches = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_reject_empty_crawler_name() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_user_agent_header_value() {
        let ua = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
        };
        assert_eq!(
            ua.header_value(),
            "TestBot/1.0 (+https://example.com/about)"
        );
    }
}
