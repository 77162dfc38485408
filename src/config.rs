//! Configuration loaded from environment variables.
//!
//! Bitrix24 connection:
//! - `BITRIX24_WEBHOOK_URL` - Inbound webhook URL (e.g. `https://portal.bitrix24.ru/rest/1/token/`)
//! - `BITRIX24_ACCESS_TOKEN` + `BITRIX24_PORTAL_URL` - OAuth access token mode
//! - `BITRIX24_REQUESTS_PER_SECOND` (default `2`)
//! - `BITRIX24_REQUEST_POOL_SIZE` (default `50`)
//! - `BITRIX24_RESPECT_VELOCITY_POLICY` (default `true`)
//! - `BITRIX24_SSL_VERIFY` (default `true`)
//!
//! MCP hosting:
//! - `MCP_SERVER_NAME`, `MCP_TRANSPORT`, `MCP_HOST`, `MCP_PORT`, `MCP_LOG_LEVEL`

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tokio::sync::Semaphore;

const DEFAULT_REQUESTS_PER_SECOND: f64 = 2.0;
const DEFAULT_REQUEST_POOL_SIZE: usize = 50;

/// Slowest accepted rate: one request a day.
const MIN_REQUESTS_PER_SECOND: f64 = 1.0 / 86_400.0;

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Either webhook_url or both access_token and portal_url must be provided")]
    MissingCredentials,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// How requests authenticate against the portal.
#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    /// Inbound webhook: the secret is part of the base URL.
    Webhook { base: String },
    /// OAuth access token sent as the `auth` parameter.
    Token { base: String, token: String },
}

impl Auth {
    /// Base URL that method names are appended to. Always ends with `/`.
    pub fn base_url(&self) -> &str {
        match self {
            Auth::Webhook { base } | Auth::Token { base, .. } => base,
        }
    }
}

/// Bitrix24 connection settings.
#[derive(Clone, PartialEq)]
pub struct BitrixConfig {
    pub webhook_url: Option<String>,
    pub access_token: Option<String>,
    pub portal_url: Option<String>,
    pub requests_per_second: f64,
    pub request_pool_size: usize,
    pub respect_velocity_policy: bool,
    pub ssl_verify: bool,
}

// Webhook URLs and tokens are credentials.
impl fmt::Debug for BitrixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitrixConfig")
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("portal_url", &self.portal_url)
            .field("requests_per_second", &self.requests_per_second)
            .field("request_pool_size", &self.request_pool_size)
            .field("respect_velocity_policy", &self.respect_velocity_policy)
            .field("ssl_verify", &self.ssl_verify)
            .finish()
    }
}

impl Default for BitrixConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            access_token: None,
            portal_url: None,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            request_pool_size: DEFAULT_REQUEST_POOL_SIZE,
            respect_velocity_policy: true,
            ssl_verify: true,
        }
    }
}

impl BitrixConfig {
    /// Create a webhook configuration with default tuning.
    pub fn webhook(url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            webhook_url: non_empty("BITRIX24_WEBHOOK_URL"),
            access_token: non_empty("BITRIX24_ACCESS_TOKEN"),
            portal_url: non_empty("BITRIX24_PORTAL_URL"),
            requests_per_second: parse_or(
                "BITRIX24_REQUESTS_PER_SECOND",
                lookup("BITRIX24_REQUESTS_PER_SECOND"),
                DEFAULT_REQUESTS_PER_SECOND,
            )?,
            request_pool_size: parse_or(
                "BITRIX24_REQUEST_POOL_SIZE",
                lookup("BITRIX24_REQUEST_POOL_SIZE"),
                DEFAULT_REQUEST_POOL_SIZE,
            )?,
            respect_velocity_policy: flag(lookup("BITRIX24_RESPECT_VELOCITY_POLICY")),
            ssl_verify: flag(lookup("BITRIX24_SSL_VERIFY")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that some form of credentials is present and that the tuning
    /// knobs are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth()?;

        let rate = self.requests_per_second;
        if !(rate.is_finite() && rate >= MIN_REQUESTS_PER_SECOND) {
            return Err(ConfigError::InvalidValue {
                key: "BITRIX24_REQUESTS_PER_SECOND",
                value: rate.to_string(),
            });
        }
        if !(1..=Semaphore::MAX_PERMITS).contains(&self.request_pool_size) {
            return Err(ConfigError::InvalidValue {
                key: "BITRIX24_REQUEST_POOL_SIZE",
                value: self.request_pool_size.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the authentication mode. A webhook URL takes precedence.
    pub fn auth(&self) -> Result<Auth, ConfigError> {
        if let Some(ref url) = self.webhook_url {
            return Ok(Auth::Webhook {
                base: with_trailing_slash(url),
            });
        }
        match (&self.access_token, &self.portal_url) {
            (Some(token), Some(portal)) => Ok(Auth::Token {
                base: format!("{}/rest/", portal.trim_end_matches('/')),
                token: token.clone(),
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

/// Which transport the MCP layer is served over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    StreamableHttp,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "streamable-http" | "http" => Ok(TransportKind::StreamableHttp),
            other => Err(format!(
                "unknown transport '{}', expected 'stdio' or 'streamable-http'",
                other
            )),
        }
    }
}

/// MCP hosting settings.
#[derive(Debug, Clone, PartialEq)]
pub struct McpConfig {
    pub server_name: String,
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: "bitrix24-mcp".to_string(),
            transport: TransportKind::Stdio,
            host: "localhost".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

impl McpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let transport = match lookup("MCP_TRANSPORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MCP_TRANSPORT",
                value: raw,
            })?,
            None => defaults.transport,
        };

        Ok(Self {
            server_name: lookup("MCP_SERVER_NAME").unwrap_or(defaults.server_name),
            transport,
            host: lookup("MCP_HOST").unwrap_or(defaults.host),
            port: parse_or("MCP_PORT", lookup("MCP_PORT"), defaults.port)?,
            log_level: lookup("MCP_LOG_LEVEL")
                .map(|l| l.to_ascii_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }
}

/// Load a `.env` file from the working directory if one exists, returning
/// its path. Runs before tracing starts, so the caller logs the outcome.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn flag(raw: Option<String>) -> bool {
    raw.map(|v| v.to_lowercase() == "true").unwrap_or(true)
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn webhook_config_uses_defaults() {
        let config = BitrixConfig::from_lookup(lookup(&[(
            "BITRIX24_WEBHOOK_URL",
            "https://example.bitrix24.ru/rest/1/abc",
        )]))
        .unwrap();

        assert_eq!(config.requests_per_second, 2.0);
        assert_eq!(config.request_pool_size, 50);
        assert!(config.respect_velocity_policy);
        assert!(config.ssl_verify);
        assert_eq!(
            config.auth().unwrap(),
            Auth::Webhook {
                base: "https://example.bitrix24.ru/rest/1/abc/".to_string()
            }
        );
    }

    #[test]
    fn token_config_builds_rest_base() {
        let config = BitrixConfig::from_lookup(lookup(&[
            ("BITRIX24_ACCESS_TOKEN", "tok"),
            ("BITRIX24_PORTAL_URL", "https://example.bitrix24.ru/"),
        ]))
        .unwrap();

        assert_eq!(
            config.auth().unwrap(),
            Auth::Token {
                base: "https://example.bitrix24.ru/rest/".to_string(),
                token: "tok".to_string()
            }
        );
    }

    #[test]
    fn missing_credentials_is_rejected() {
        let err = BitrixConfig::from_lookup(lookup(&[("BITRIX24_ACCESS_TOKEN", "tok")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn flags_are_true_only_for_literal_true() {
        let config = BitrixConfig::from_lookup(lookup(&[
            ("BITRIX24_WEBHOOK_URL", "https://x/rest/1/y/"),
            ("BITRIX24_SSL_VERIFY", "no"),
            ("BITRIX24_RESPECT_VELOCITY_POLICY", "TRUE"),
        ]))
        .unwrap();

        assert!(!config.ssl_verify);
        assert!(config.respect_velocity_policy);
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = BitrixConfig::from_lookup(lookup(&[
            ("BITRIX24_WEBHOOK_URL", "https://x/rest/1/y/"),
            ("BITRIX24_REQUEST_POOL_SIZE", "many"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "BITRIX24_REQUEST_POOL_SIZE",
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn rate_too_small_for_a_delay_is_rejected() {
        let err = BitrixConfig::from_lookup(lookup(&[
            ("BITRIX24_WEBHOOK_URL", "https://x/rest/1/y/"),
            ("BITRIX24_REQUESTS_PER_SECOND", "1e-30"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "BITRIX24_REQUESTS_PER_SECOND",
                ..
            }
        ));
    }

    #[test]
    fn non_positive_or_infinite_rate_is_rejected() {
        for raw in ["0", "-2", "inf", "NaN"] {
            let result = BitrixConfig::from_lookup(lookup(&[
                ("BITRIX24_WEBHOOK_URL", "https://x/rest/1/y/"),
                ("BITRIX24_REQUESTS_PER_SECOND", raw),
            ]));
            assert!(
                matches!(
                    result,
                    Err(ConfigError::InvalidValue {
                        key: "BITRIX24_REQUESTS_PER_SECOND",
                        ..
                    })
                ),
                "{} accepted",
                raw
            );
        }
    }

    #[test]
    fn pool_size_beyond_permit_limit_is_rejected() {
        let too_many = (Semaphore::MAX_PERMITS + 1).to_string();
        let err = BitrixConfig::from_lookup(lookup(&[
            ("BITRIX24_WEBHOOK_URL", "https://x/rest/1/y/"),
            ("BITRIX24_REQUEST_POOL_SIZE", too_many.as_str()),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "BITRIX24_REQUEST_POOL_SIZE",
                value: too_many
            }
        );
    }

    #[test]
    fn empty_pool_is_rejected() {
        let config = BitrixConfig {
            request_pool_size: 0,
            ..BitrixConfig::webhook("https://x/rest/1/y/")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_webhook() {
        let config = BitrixConfig::webhook("https://x/rest/1/secret/");
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn mcp_config_reads_overrides() {
        let config = McpConfig::from_lookup(lookup(&[
            ("MCP_TRANSPORT", "streamable-http"),
            ("MCP_PORT", "9100"),
            ("MCP_LOG_LEVEL", "DEBUG"),
        ]))
        .unwrap();

        assert_eq!(config.transport, TransportKind::StreamableHttp);
        assert_eq!(config.port, 9100);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server_name, "bitrix24-mcp");
    }

    #[test]
    fn mcp_config_rejects_unknown_transport() {
        assert!(McpConfig::from_lookup(lookup(&[("MCP_TRANSPORT", "sse")])).is_err());
    }
}
