use chrono::Duration;
use contact_gate::settings::{AppConfig, AppEnvironment};

#[test]
fn defaults_are_valid_and_match_reference_limits() {
    let config = AppConfig::default();

    assert!(config.validate().is_ok());

    let policy = config.rate_limit_policy();
    assert_eq!(policy.max_submissions, 5);
    assert_eq!(policy.window, Duration::hours(1));
}

#[test]
fn zero_limits_are_rejected() {
    let config = AppConfig {
        rate_limit_max_submissions: 0,
        rate_limit_window_secs: 0,
        ..AppConfig::default()
    };

    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("RATE_LIMIT_MAX_SUBMISSIONS"));
    assert!(message.contains("RATE_LIMIT_WINDOW_SECS"));
}

#[test]
fn partial_emailjs_credentials_are_rejected() {
    let config = AppConfig {
        emailjs_service_id: Some("service".to_string()),
        ..AppConfig::default()
    };

    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("must be set together"));
}

#[test]
fn malformed_recipient_is_rejected() {
    let config = AppConfig {
        contact_recipient: "info at example".to_string(),
        ..AppConfig::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn wildcard_cors_is_refused_in_production() {
    let wildcard = AppConfig {
        env: AppEnvironment::Production,
        ..AppConfig::default()
    };
    assert!(wildcard.validate().is_err());

    let explicit = AppConfig {
        env: AppEnvironment::Production,
        cors_allowed_origins: vec!["https://www.example.it, https://example.it".to_string()],
        ..AppConfig::default()
    };
    assert!(explicit.validate().is_ok());
    assert_eq!(
        explicit.cors_origins(),
        vec!["https://www.example.it".to_string(), "https://example.it".to_string()]
    );
}

#[test]
fn debug_output_redacts_secrets() {
    let config = AppConfig {
        redis_url: Some("redis://:hunter2@cache:6379".to_string()),
        emailjs_private_key: Some("very-private".to_string()),
        ..AppConfig::default()
    };

    let debug = format!("{:?}", config);
    assert!(!debug.contains("hunter2"));
    assert!(!debug.contains("very-private"));
    assert!(debug.contains("[REDACTED]"));
}

#[test]
fn environment_names_parse_case_insensitively() {
    assert_eq!("Production".parse::<AppEnvironment>().unwrap(), AppEnvironment::Production);
    assert_eq!(AppEnvironment::Testing.to_string(), "testing");
    assert!("staging".parse::<AppEnvironment>().is_err());
}
