// Unit tests for gateway config loading and validation

use crate::config::GatewayConfig;
use crate::error::config::ConfigError;

use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

const TOKEN_ENV_VAR: &str = "GATEWAY_TOKEN";

#[test]
fn given_defaults_when_inspected_then_match_gateway_expectations() {
    let config = GatewayConfig::default();

    assert_eq!(config.role, "operator");
    assert_eq!(config.scopes, vec!["operator.admin".to_string()]);
    assert_eq!(config.timeouts.challenge(), Duration::from_secs(6));
    assert_eq!(config.timeouts.connect(), Duration::from_secs(12));
    assert_eq!(config.timeouts.request(), Duration::from_secs(15));
    assert_eq!(config.timeouts.heartbeat(), Duration::from_secs(30));
    assert!(config.validate().is_ok());
}

#[test]
fn given_missing_file_when_loading_then_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let config = GatewayConfig::load(&temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, GatewayConfig::default());
}

/// **VALUE**: Verifies a partial file overrides only what it names.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` that makes
/// every field mandatory and rejects a one-line config.
#[test]
fn given_partial_file_when_loading_then_unset_fields_keep_defaults() {
    // GIVEN
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gateway.toml");
    fs::write(
        &path,
        r#"
role = "viewer"

[timeouts]
request_timeout_ms = 2500
"#,
    )
    .unwrap();

    // WHEN
    let config = GatewayConfig::load(&path).unwrap();

    // THEN
    assert_eq!(config.role, "viewer");
    assert_eq!(config.timeouts.request(), Duration::from_millis(2_500));
    assert_eq!(config.timeouts.challenge(), Duration::from_secs(6));
    assert_eq!(config.client, GatewayConfig::default().client);
}

#[test]
fn given_invalid_toml_when_loading_then_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gateway.toml");
    fs::write(&path, "role = [unterminated").unwrap();

    let result = GatewayConfig::load(&path);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn given_zero_timeout_when_loading_then_validation_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gateway.toml");
    fs::write(&path, "[timeouts]\nconnect_timeout_ms = 0\n").unwrap();

    let result = GatewayConfig::load(&path);

    match result {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains("connect_timeout_ms"));
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn given_blank_role_when_validating_then_error() {
    let config = GatewayConfig {
        role: "  ".to_string(),
        ..GatewayConfig::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
#[serial]
fn given_token_env_var_when_reading_then_trimmed_token_returned() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var(TOKEN_ENV_VAR, "  env-token  ") };

    let token = GatewayConfig::token_from_env();

    unsafe { std::env::remove_var(TOKEN_ENV_VAR) };
    assert_eq!(token.map(|token| token.as_str().to_string()), Some("env-token".to_string()));
}

#[test]
#[serial]
fn given_blank_token_env_var_when_reading_then_none() {
    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var(TOKEN_ENV_VAR, "   ") };

    let token = GatewayConfig::token_from_env();

    unsafe { std::env::remove_var(TOKEN_ENV_VAR) };
    assert!(token.is_none());
}
