// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid host names, date ranges, and URL schemes.

use crate::diagnostic::ConfigError;
use crate::model::{MillwrightConfig, parse_iso_date};

/// Upper bound for `agent.max_turns`.
const MAX_TURNS_CEILING: usize = 20;

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with("http://") || value.starts_with("https://"))
        && value.split("://").nth(1).is_some_and(|rest| !rest.is_empty())
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MillwrightConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(invalid("gateway.host must not be empty".to_string()));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(invalid(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.agent.max_turns == 0 || config.agent.max_turns > MAX_TURNS_CEILING {
        errors.push(invalid(format!(
            "agent.max_turns must be between 1 and {MAX_TURNS_CEILING}, got {}",
            config.agent.max_turns
        )));
    }

    if config.agent.model_timeout_secs == 0 {
        errors.push(invalid("agent.model_timeout_secs must be positive".to_string()));
    }

    if config.analytics.timeout_secs == 0 {
        errors.push(invalid("analytics.timeout_secs must be positive".to_string()));
    }

    if !is_http_url(&config.provider.base_url) {
        errors.push(invalid(format!(
            "provider.base_url `{}` must be an http(s) URL",
            config.provider.base_url
        )));
    }

    if !is_http_url(&config.analytics.base_url) {
        errors.push(invalid(format!(
            "analytics.base_url `{}` must be an http(s) URL",
            config.analytics.base_url
        )));
    }

    if config.provider.model.trim().is_empty() {
        errors.push(invalid("provider.model must not be empty".to_string()));
    }

    if config.factory.machines.is_empty() {
        errors.push(invalid(
            "factory.machines must list at least one machine".to_string(),
        ));
    }

    let mut parsed = [None, None];
    for (slot, (field, value)) in parsed.iter_mut().zip([
        ("factory.data_start", &config.factory.data_start),
        ("factory.data_end", &config.factory.data_end),
    ]) {
        if let Some(value) = value {
            match parse_iso_date(value) {
                Some(date) => *slot = Some(date),
                None => errors.push(invalid(format!(
                    "{field} `{value}` is not a YYYY-MM-DD date"
                ))),
            }
        }
    }
    if let [Some(start), Some(end)] = parsed
        && start > end
    {
        errors.push(invalid(format!(
            "factory.data_start {start} is after factory.data_end {end}"
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &MillwrightConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&MillwrightConfig::default()).is_ok());
    }

    #[test]
    fn empty_host_fails_validation() {
        let mut config = MillwrightConfig::default();
        config.gateway.host = " ".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("gateway.host")));
    }

    #[test]
    fn max_turns_out_of_range_fails() {
        let mut config = MillwrightConfig::default();
        config.agent.max_turns = 0;
        assert!(messages(&config).iter().any(|m| m.contains("max_turns")));
        config.agent.max_turns = 21;
        assert!(messages(&config).iter().any(|m| m.contains("max_turns")));
    }

    #[test]
    fn reversed_data_range_fails() {
        let mut config = MillwrightConfig::default();
        config.factory.data_start = Some("2024-12-01".into());
        config.factory.data_end = Some("2024-11-01".into());
        assert!(messages(&config).iter().any(|m| m.contains("is after")));
    }

    #[test]
    fn malformed_date_fails() {
        let mut config = MillwrightConfig::default();
        config.factory.data_end = Some("30/11/2024".into());
        assert!(messages(&config).iter().any(|m| m.contains("data_end")));
    }

    #[test]
    fn non_http_urls_fail() {
        let mut config = MillwrightConfig::default();
        config.analytics.base_url = "ftp://metrics".into();
        config.provider.base_url = "https://".into();
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("analytics.base_url")));
        assert!(msgs.iter().any(|m| m.contains("provider.base_url")));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = MillwrightConfig::default();
        config.gateway.host = String::new();
        config.factory.machines.clear();
        config.agent.model_timeout_secs = 0;
        assert_eq!(messages(&config).len(), 3);
    }
}
