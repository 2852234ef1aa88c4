// SPDX-FileCopyrightText: 2026 Millwright Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for Millwright configuration loading.

use std::io::Write;

use millwright_config::diagnostic::ConfigError;
use millwright_config::model::MillwrightConfig;
use millwright_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

#[test]
fn full_document_deserializes() {
    let toml = r#"
[agent]
name = "floor-assistant"
log_level = "debug"
max_turns = 8
model_timeout_secs = 45
tool_retries = 2

[provider]
api_key = "sk-test"
base_url = "http://localhost:9999/v1"
model = "gpt-4o-mini"
max_tokens = 1024

[factory]
name = "Plant 7"
data_start = "2024-11-01"
data_end = "2024-11-30"
machines = ["Lathe-01", "Press-02"]
shifts = ["Day", "Night"]

[memory]
data_dir = "/var/lib/millwright"

[analytics]
base_url = "http://metrics:8000"
timeout_secs = 5

[gateway]
host = "0.0.0.0"
port = 8080
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "floor-assistant");
    assert_eq!(config.agent.max_turns, 8);
    assert_eq!(config.agent.tool_retries, 2);
    assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.provider.max_tokens, Some(1024));
    assert_eq!(config.factory.machines, vec!["Lathe-01", "Press-02"]);
    assert!(config.factory.data_range().is_some());
    assert_eq!(
        config.memory.data_dir.as_deref(),
        Some(std::path::Path::new("/var/lib/millwright"))
    );
    assert_eq!(config.analytics.timeout_secs, 5);
    assert_eq!(config.gateway.port, 8080);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("[gateway]\nport = 4000\n").unwrap();
    assert_eq!(config.gateway.port, 4000);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.factory.name, "Demo Factory");
    assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
}

#[test]
fn unknown_key_gets_suggestion_and_span() {
    let toml = "[factory]\nmachnes = [\"CNC-001\"]\n";
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            valid_keys,
            span,
            ..
        } => {
            assert_eq!(key, "machnes");
            assert_eq!(suggestion.as_deref(), Some("machines"));
            assert!(valid_keys.contains("shifts"));
            assert!(span.is_some(), "inline source should locate the key");
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let errors = load_and_validate_str("[telemetry]\nenabled = true\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::UnknownKey { key, .. } if key == "telemetry"));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
    match &errors[0] {
        ConfigError::InvalidType { key, .. } => assert!(key.contains("port"), "got {key}"),
        other => panic!("expected InvalidType, got {other:?}"),
    }
}

#[test]
fn semantic_errors_surface_through_load_and_validate() {
    let toml = r#"
[agent]
max_turns = 0

[factory]
data_start = "2024-12-01"
data_end = "2024-11-01"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn diagnostics_render_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[agent]\nnaem = \"x\"\n").unwrap_err();
    let error = &errors[0];
    assert_eq!(
        error.code().map(|c| c.to_string()).as_deref(),
        Some("millwright::config::unknown_key")
    );

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, error)
        .expect("should render");
    assert!(buf.contains("naem"));
    assert!(buf.contains("did you mean `name`"));
}

#[test]
#[serial]
fn env_overrides_keys_with_underscores() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[factory]\ndata_start = \"2024-01-01\"").unwrap();

    // SAFETY: serialized with every other env-mutating test.
    unsafe {
        std::env::set_var("MILLWRIGHT_FACTORY_DATA_START", "2024-11-01");
        std::env::set_var("MILLWRIGHT_AGENT_MAX_TURNS", "7");
    }
    let result = load_and_validate_path(file.path());
    unsafe {
        std::env::remove_var("MILLWRIGHT_FACTORY_DATA_START");
        std::env::remove_var("MILLWRIGHT_AGENT_MAX_TURNS");
    }

    let config = result.expect("env overrides should validate");
    assert_eq!(config.factory.data_start.as_deref(), Some("2024-11-01"));
    assert_eq!(config.agent.max_turns, 7);
}

#[test]
#[serial]
fn env_override_of_unknown_key_is_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();

    unsafe { std::env::set_var("MILLWRIGHT_GATEWAY_PROT", "9000") };
    let result = load_and_validate_path(file.path());
    unsafe { std::env::remove_var("MILLWRIGHT_GATEWAY_PROT") };

    let errors = result.unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { suggestion: Some(s), .. } if s == "port"
    )));
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/millwright.toml"));
    let config = config.expect("missing file should be skipped");
    assert_eq!(config.agent.max_turns, MillwrightConfig::default().agent.max_turns);
}
