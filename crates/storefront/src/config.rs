//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; when neither is set the in-memory store is used)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 5000)
//! - `STOREFRONT_UPLOADS_DIR` - Directory for uploaded files (default: uploads)
//! - `STOREFRONT_CORS_ORIGIN` - Allowed browser origin for the API
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Mail
//!   delivery; all four or none
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `PROFANITY_FILTER` - `on` (default) or `off`
//! - `PROFANITY_EXTRA_WORDS` - Comma-separated words added to the filter
//! - `NOTIFICATION_TIMEOUT_SECS` - Bound on receipt delivery (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Root directory for uploaded files, served under `/uploads`
    pub uploads_dir: PathBuf,
    /// Allowed CORS origin
    pub cors_origin: Option<String>,
    /// SMTP configuration, absent when mail is not configured
    pub email: Option<EmailConfig>,
    /// Review text filtering
    pub profanity: ProfanityConfig,
    /// Upper bound on a single receipt notification
    pub notification_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Profanity filter settings.
#[derive(Debug, Clone)]
pub struct ProfanityConfig {
    pub enabled: bool,
    /// Words filtered in addition to the built-in list
    pub extra_words: Vec<String>,
}

impl Default for ProfanityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_words: Vec::new(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, if the SMTP block is
    /// only partially set, or if the SMTP password fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL");
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let uploads_dir = PathBuf::from(get_env_or_default("STOREFRONT_UPLOADS_DIR", "uploads"));
        let cors_origin = get_optional_env("STOREFRONT_CORS_ORIGIN");

        let email = EmailConfig::from_env()?;
        let profanity = ProfanityConfig::from_env()?;
        let notification_timeout = get_env_or_default("NOTIFICATION_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("NOTIFICATION_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            uploads_dir,
            cors_origin,
            email,
            profanity,
            notification_timeout,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = get_optional_env("SMTP_HOST");
        let username = get_optional_env("SMTP_USERNAME");
        let password = get_optional_env("SMTP_PASSWORD");
        let from = get_optional_env("SMTP_FROM");

        match (host, username, password, from) {
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from_address)) => {
                validate_secret_strength(&password, "SMTP_PASSWORD")?;
                let smtp_port = get_env_or_default("SMTP_PORT", "587")
                    .parse::<u16>()
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string())
                    })?;

                Ok(Some(Self {
                    smtp_host,
                    smtp_port,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together"
                    .to_string(),
            )),
        }
    }
}

impl ProfanityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let enabled = parse_toggle(
            "PROFANITY_FILTER",
            &get_env_or_default("PROFANITY_FILTER", "on"),
        )?;
        let extra_words = get_optional_env("PROFANITY_EXTRA_WORDS")
            .map(|raw| parse_word_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            enabled,
            extra_words,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_toggle(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected on/off, got '{other}'"),
        )),
    }
}

fn parse_word_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-smtp-password", "SMTP_PASSWORD").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&", "SMTP_PASSWORD").is_ok());
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("PROFANITY_FILTER", "on").unwrap());
        assert!(parse_toggle("PROFANITY_FILTER", " TRUE ").unwrap());
        assert!(!parse_toggle("PROFANITY_FILTER", "off").unwrap());
        assert!(parse_toggle("PROFANITY_FILTER", "maybe").is_err());
    }

    #[test]
    fn test_parse_word_list_trims_and_skips_blanks() {
        assert_eq!(
            parse_word_list(" Darn, ,heck ,"),
            vec!["darn".to_string(), "heck".to_string()]
        );
    }

    #[test]
    fn test_email_config_debug_redacts_secrets() {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "orders@sillage.shop".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "orders@sillage.shop".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
