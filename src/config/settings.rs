//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::http::HEALTH_PATH;

/// Characters the router treats as parameter or wildcard syntax.
const ROUTE_META_CHARS: &[char] = &['{', '}', '*', ':'];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Listener and transport settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Monthly subscription fees per platform.
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,

    /// Movie-metadata lookup settings.
    #[serde(default)]
    pub tmdb: TmdbConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |setting, reason: String| Err(ConfigError::Invalid { setting, reason });

        let rpc_path = &self.server.rpc_path;
        if !rpc_path.starts_with('/') || rpc_path == "/" || rpc_path.ends_with('/') {
            return invalid(
                "server.rpc_path",
                format!("'{rpc_path}' must start with '/', not end with '/', and not be the root"),
            );
        }
        if let Some(c) = rpc_path.chars().find(|c| ROUTE_META_CHARS.contains(c)) {
            return invalid(
                "server.rpc_path",
                format!("'{rpc_path}' contains '{c}', which is reserved for route parameters"),
            );
        }
        if rpc_path.chars().any(char::is_whitespace) {
            return invalid(
                "server.rpc_path",
                format!("'{rpc_path}' must not contain whitespace"),
            );
        }
        if rpc_path == HEALTH_PATH {
            return invalid(
                "server.rpc_path",
                format!("'{rpc_path}' collides with the {HEALTH_PATH} route"),
            );
        }

        if !(1..=300).contains(&self.server.keep_alive_secs) {
            return invalid(
                "server.keep_alive_secs",
                format!("{} is not between 1 and 300", self.server.keep_alive_secs),
            );
        }

        if let Some((platform, _)) = self.subscriptions.fees.iter().find(|(_, fee)| **fee == 0) {
            return invalid(
                "subscriptions.fees",
                format!("fee for '{platform}' must be positive"),
            );
        }

        if self.subscriptions.fallback_fee == 0 {
            return invalid("subscriptions.fallback_fee", "must be positive".to_string());
        }

        if self.tmdb.timeout_secs == 0 {
            return invalid("tmdb.timeout_secs", "must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Which transport binding a deployment serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Plain request/response: `POST <rpc_path>` returns the reply as the body.
    #[default]
    Http,
    /// Event stream on `GET <rpc_path>`, envelopes posted to `<rpc_path>/message`.
    Sse,
    /// Newline-delimited JSON over stdin/stdout.
    Stdio,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Sse => write!(f, "sse"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}

/// Listener and transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route carrying JSON-RPC envelopes.
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    /// Transport binding for this deployment.
    #[serde(default)]
    pub transport: TransportMode,

    /// Interval between SSE keep-alive comments, in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Externally visible base URL (e.g. `https://ooottt.example.com`).
    /// When unset, the SSE endpoint announcement is built from request headers.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rpc_path: default_rpc_path(),
            transport: TransportMode::default(),
            keep_alive_secs: default_keep_alive_secs(),
            public_url: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

fn default_rpc_path() -> String {
    "/mcp".to_string()
}

const fn default_keep_alive_secs() -> u64 {
    15
}

/// Subscription fee table, in KRW per month.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionConfig {
    /// Fee per platform key. Order is preserved for listings.
    #[serde(default = "default_fees")]
    pub fees: IndexMap<String, u32>,

    /// Fee assumed for platforms missing from the table.
    #[serde(default = "default_fallback_fee")]
    pub fallback_fee: u32,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            fees: default_fees(),
            fallback_fee: default_fallback_fee(),
        }
    }
}

fn default_fees() -> IndexMap<String, u32> {
    [
        ("netflix", 17_000),
        ("watcha", 12_900),
        ("tving", 13_900),
        ("wavve", 13_900),
        ("disney", 13_900),
        ("apple", 8_900),
        ("amazon", 7_900),
    ]
    .into_iter()
    .map(|(platform, fee)| (platform.to_string(), fee))
    .collect()
}

const fn default_fallback_fee() -> u32 {
    15_000
}

/// TMDB lookup configuration.
///
/// The API key is never read from this file; it is supplied through the
/// `TMDB_API_KEY` environment variable or `--tmdb-api-key`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TmdbConfig {
    /// API base URL.
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,

    /// Response language passed to TMDB.
    #[serde(default = "default_tmdb_language")]
    pub language: String,

    /// Upper bound on a single lookup, in seconds.
    #[serde(default = "default_tmdb_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_tmdb_base_url(),
            language: default_tmdb_language(),
            timeout_secs: default_tmdb_timeout_secs(),
        }
    }
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "ko-KR".to_string()
}

const fn default_tmdb_timeout_secs() -> u64 {
    5
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.rpc_path, "/mcp");
        assert_eq!(config.server.transport, TransportMode::Http);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": {
                "host": "127.0.0.1",
                "port": 8080,
                "rpc_path": "/rpc",
                "transport": "sse",
                "keep_alive_secs": 20,
                "public_url": "https://ooottt.example.com"
            },
            "subscriptions": {
                "fees": { "netflix": 13500, "tving": 10900 },
                "fallback_fee": 12000
            },
            "tmdb": {
                "base_url": "http://localhost:9999",
                "language": "en-US",
                "timeout_secs": 2
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.transport, TransportMode::Sse);
        assert_eq!(config.server.keep_alive_secs, 20);
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://ooottt.example.com")
        );
        let platforms: Vec<_> = config.subscriptions.fees.keys().cloned().collect();
        assert_eq!(platforms, ["netflix", "tving"]);
        assert_eq!(config.subscriptions.fallback_fee, 12_000);
        assert_eq!(config.tmdb.language, "en-US");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn subscription_defaults_keep_order() {
        let config = SubscriptionConfig::default();
        assert_eq!(config.fees.get_index(0), Some((&"netflix".to_string(), &17_000)));
        assert_eq!(config.fees.get("amazon"), Some(&7_900));
        assert_eq!(config.fallback_fee, 15_000);
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_bad_rpc_path() {
        for path in ["mcp", "/", "/mcp/"] {
            let mut config = Config::default();
            config.server.rpc_path = path.to_string();
            assert!(config.validate().is_err(), "{path} should be rejected");
        }
    }

    #[test]
    fn reject_route_syntax_in_rpc_path() {
        for path in ["/:rpc", "/{rpc}", "/mcp/*rest", "/a}b", "/m cp"] {
            let mut config = Config::default();
            config.server.rpc_path = path.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("server.rpc_path"), "{path}: {err}");
        }
    }

    #[test]
    fn reject_rpc_path_on_health_route() {
        let mut config = Config::default();
        config.server.rpc_path = "/health".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn accept_nested_rpc_path() {
        let mut config = Config::default();
        config.server.rpc_path = "/api/v1/mcp".to_string();
        assert!(config.validate().is_ok());
        config.server.rpc_path = "/healthz".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reject_keep_alive_out_of_range() {
        let mut config = Config::default();
        config.server.keep_alive_secs = 0;
        assert!(config.validate().is_err());
        config.server.keep_alive_secs = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_fee() {
        let json = r#"{ "subscriptions": { "fees": { "netflix": 0 } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("netflix"));
    }

    #[test]
    fn reject_unknown_transport() {
        let json = r#"{ "server": { "transport": "websocket" } }"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
