use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use std::{env, fmt, str::FromStr};
use url::Url;

use crate::{
    constants::{DEFAULT_MAX_SUBMISSIONS, DEFAULT_WINDOW_SECS, EMAIL_SHAPE},
    entities::rate_limit::RateLimitPolicy,
};

const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Shared rate limit counters; in-process counters when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    /// Take the client key from `X-Forwarded-For`/`X-Real-IP`. Only safe
    /// behind a proxy that overwrites them.
    #[serde(default = "default_true")]
    pub trust_forwarded_headers: bool,

    #[serde(default = "default_max_submissions")]
    pub rate_limit_max_submissions: u32,

    #[serde(default = "default_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub rate_limit_sweep_interval_secs: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_contact_recipient")]
    pub contact_recipient: String,

    #[serde(default = "default_emailjs_endpoint")]
    pub emailjs_endpoint: String,

    #[serde(default)]
    pub emailjs_service_id: Option<String>,

    #[serde(default)]
    pub emailjs_template_id: Option<String>,

    #[serde(default)]
    pub emailjs_public_key: Option<String>,

    #[serde(default)]
    pub emailjs_private_key: Option<String>,

    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Contact-Gate".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_redis_key_prefix() -> String {
    "contact:rl".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_max_submissions() -> u32 {
    DEFAULT_MAX_SUBMISSIONS
}
fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}
fn default_sweep_interval_secs() -> u64 {
    10 * 60
}
fn default_max_body_bytes() -> usize {
    16 * 1024
}
fn default_contact_recipient() -> String {
    "info@gimsservice.it".to_string()
}
fn default_emailjs_endpoint() -> String {
    "https://api.emailjs.com/api/v1.0/email/send".to_string()
}
fn default_delivery_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            env: default_env(),
            name: default_name(),
            port: default_port(),
            host: default_host(),
            worker_count: default_worker_count(),
            redis_url: None,
            redis_key_prefix: default_redis_key_prefix(),
            cors_allowed_origins: default_cors_origins(),
            trust_forwarded_headers: default_true(),
            rate_limit_max_submissions: default_max_submissions(),
            rate_limit_window_secs: default_window_secs(),
            rate_limit_sweep_interval_secs: default_sweep_interval_secs(),
            max_body_bytes: default_max_body_bytes(),
            contact_recipient: default_contact_recipient(),
            emailjs_endpoint: default_emailjs_endpoint(),
            emailjs_service_id: None,
            emailjs_template_id: None,
            emailjs_public_key: None,
            emailjs_private_key: None,
            delivery_timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins"),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;
        config.emailjs_service_id = non_blank(config.emailjs_service_id);
        config.emailjs_template_id = non_blank(config.emailjs_template_id);
        config.emailjs_public_key = non_blank(config.emailjs_public_key);
        config.emailjs_private_key = non_blank(config.emailjs_private_key);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.rate_limit_max_submissions == 0 {
            errors.push("RATE_LIMIT_MAX_SUBMISSIONS must be greater than zero".to_string());
        }
        if self.rate_limit_window_secs == 0 || self.rate_limit_window_secs > MAX_WINDOW_SECS {
            errors.push(format!("RATE_LIMIT_WINDOW_SECS must be between 1 and {MAX_WINDOW_SECS}"));
        }
        if self.rate_limit_sweep_interval_secs == 0 {
            errors.push("RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than zero".to_string());
        }
        if self.max_body_bytes == 0 {
            errors.push("MAX_BODY_BYTES must be greater than zero".to_string());
        }
        if !EMAIL_SHAPE.is_match(&self.contact_recipient) {
            errors.push("CONTACT_RECIPIENT must be an email address".to_string());
        }
        if Url::parse(&self.emailjs_endpoint).is_err() {
            errors.push("EMAILJS_ENDPOINT must be a valid URL".to_string());
        }

        let emailjs_parts = [
            &self.emailjs_service_id,
            &self.emailjs_template_id,
            &self.emailjs_public_key,
        ];
        let configured = emailjs_parts.iter().filter(|p| p.is_some()).count();
        if configured != 0 && configured != emailjs_parts.len() {
            errors.push(
                "EMAILJS_SERVICE_ID, EMAILJS_TEMPLATE_ID and EMAILJS_PUBLIC_KEY must be set together"
                    .to_string(),
            );
        }

        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(self.rate_limit_max_submissions, self.rate_limit_window_secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for Option<String> {
    fn redact(&self) -> &str {
        match self {
            None => "[MISSING]",
            Some(_) => "[REDACTED]",
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("redis_url", &self.redis_url.redact())
            .field("redis_key_prefix", &self.redis_key_prefix)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .field("rate_limit_max_submissions", &self.rate_limit_max_submissions)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("rate_limit_sweep_interval_secs", &self.rate_limit_sweep_interval_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("contact_recipient", &self.contact_recipient)
            .field("emailjs_endpoint", &self.emailjs_endpoint)
            .field("emailjs_service_id", &self.emailjs_service_id)
            .field("emailjs_template_id", &self.emailjs_template_id)
            .field("emailjs_public_key", &self.emailjs_public_key.redact())
            .field("emailjs_private_key", &self.emailjs_private_key.redact())
            .field("delivery_timeout_secs", &self.delivery_timeout_secs)
            .finish()
    }
}
