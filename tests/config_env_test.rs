//! Config environment variable tests
//!
//! Config::from_env() also loads a .env file via dotenvy, so each test sets
//! the variables it asserts on and removes them afterwards.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use narrative_workshop::config::{Config, DatabaseConfig, LogFormat, LoggingConfig, WorkshopConfig};
use serial_test::serial;
use std::env;

fn with_api_key() {
    env::set_var("LANGBASE_API_KEY", "test-key");
}

#[test]
#[serial]
fn test_config_requires_api_key() {
    let saved = env::var("LANGBASE_API_KEY").ok();
    env::remove_var("LANGBASE_API_KEY");

    let result = Config::from_env();

    // a developer .env file may still provide the key
    if env::var("LANGBASE_API_KEY").is_err() {
        let err = result.unwrap_err();
        assert!(err.to_string().contains("LANGBASE_API_KEY"));
    }

    if let Some(key) = saved {
        env::set_var("LANGBASE_API_KEY", key);
    }
}

#[test]
#[serial]
fn test_config_from_env_custom_base_url() {
    with_api_key();
    env::set_var("LANGBASE_BASE_URL", "https://custom.api.com");

    let config = Config::from_env().unwrap();
    assert_eq!(config.langbase.api_key, "test-key");
    assert_eq!(config.langbase.base_url, "https://custom.api.com");

    env::remove_var("LANGBASE_BASE_URL");
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    env::set_var("DATABASE_PATH", "/custom/workshop.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = DatabaseConfig::from_env();
    assert_eq!(config.path.to_str(), Some("/custom/workshop.db"));
    assert_eq!(config.max_connections, 10);

    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "JSON");
    env::set_var("LOG_LEVEL", "debug");

    let config = LoggingConfig::from_env();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "debug");

    env::set_var("LOG_FORMAT", "anything-else");
    assert_eq!(LoggingConfig::from_env().format, LogFormat::Pretty);

    env::remove_var("LOG_FORMAT");
    env::remove_var("LOG_LEVEL");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    with_api_key();
    env::set_var("REQUEST_TIMEOUT_MS", "60000");
    env::set_var("MAX_RETRIES", "5");
    env::set_var("RETRY_DELAY_MS", "2000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);
    assert_eq!(config.request.max_retries, 5);
    assert_eq!(config.request.retry_delay_ms, 2000);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MAX_RETRIES");
    env::remove_var("RETRY_DELAY_MS");
}

#[test]
#[serial]
fn test_config_from_env_custom_pipes() {
    with_api_key();
    env::set_var("PIPE_ANALYSIS", "rubric-v3");
    env::set_var("PIPE_REFLECTION", "socratic-v2");

    let config = Config::from_env().unwrap();
    assert_eq!(config.pipes.analysis, "rubric-v3");
    assert_eq!(config.pipes.reflection, "socratic-v2");

    env::remove_var("PIPE_ANALYSIS");
    env::remove_var("PIPE_REFLECTION");
}

#[test]
#[serial]
fn test_workshop_thresholds_from_env() {
    env::set_var("WORKSHOP_COMPLETION_MIN_CHARS", "120");
    env::set_var("WORKSHOP_QUICK_WIN_GAP", "7.5");
    env::set_var("WORKSHOP_MAX_EXAMPLES", "2");

    let config = WorkshopConfig::from_env();
    assert_eq!(config.completion_min_chars, 120);
    assert_eq!(config.quick_win_gap, 7.5);
    assert_eq!(config.max_examples, 2);

    env::remove_var("WORKSHOP_COMPLETION_MIN_CHARS");
    env::remove_var("WORKSHOP_QUICK_WIN_GAP");
    env::remove_var("WORKSHOP_MAX_EXAMPLES");
}

#[test]
#[serial]
fn test_invalid_numbers_fall_back_to_defaults() {
    env::set_var("WORKSHOP_COMPLETION_MIN_CHARS", "lots");
    env::set_var("WORKSHOP_QUICK_WIN_GAP", "");

    let config = WorkshopConfig::from_env();
    let defaults = WorkshopConfig::default();
    assert_eq!(config.completion_min_chars, defaults.completion_min_chars);
    assert_eq!(config.quick_win_gap, defaults.quick_win_gap);

    env::remove_var("WORKSHOP_COMPLETION_MIN_CHARS");
    env::remove_var("WORKSHOP_QUICK_WIN_GAP");
}
