//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (HUDDLE_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fan-out configuration.
    #[serde(default)]
    pub fanout: FanOutConfig,

    /// Chat feature switches.
    #[serde(default)]
    pub features: FeatureConfig,

    /// REST facade configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Fan-out backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutBackend {
    /// Redis pub/sub, shared by all server processes.
    Redis,
    /// In-process loopback; single-node only.
    Memory,
}

/// Fan-out configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutConfig {
    /// Backend to use.
    #[serde(default = "default_fanout_backend")]
    pub backend: FanOutBackend,

    /// Backend endpoint address.
    #[serde(default = "default_fanout_url")]
    pub url: String,

    /// Namespace scoping the pub/sub channel, so unrelated deployments
    /// can share one Redis.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Chat feature switches, evaluated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Enable typing indicators.
    #[serde(default = "default_true")]
    pub typing_indicators: bool,

    /// Enable read receipts.
    #[serde(default = "default_true")]
    pub read_receipts: bool,

    /// Staleness timeout for typing markers in milliseconds.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_ms: u64,
}

impl FeatureConfig {
    /// The typing timeout as a duration.
    #[must_use]
    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }
}

/// REST facade configuration. Entirely outside the session core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Expose the REST facade.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path prefix for facade routes.
    #[serde(default = "default_api_prefix")]
    pub prefix: String,

    /// Require an Authorization header on facade routes.
    #[serde(default)]
    pub auth_required: bool,

    /// Answer with a permissive CORS origin header.
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("HUDDLE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("HUDDLE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4000)
}

fn default_true() -> bool {
    true
}

fn default_fanout_backend() -> FanOutBackend {
    FanOutBackend::Redis
}

fn default_fanout_url() -> String {
    std::env::var("HUDDLE_FANOUT_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn default_namespace() -> String {
    std::env::var("HUDDLE_NAMESPACE").unwrap_or_else(|_| "huddle".to_string())
}

fn default_typing_timeout() -> u64 {
    6_000 // 6 seconds
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_max_message_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            fanout: FanOutConfig::default(),
            features: FeatureConfig::default(),
            api: ApiConfig::default(),
            limits: LimitsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            backend: default_fanout_backend(),
            url: default_fanout_url(),
            namespace: default_namespace(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            typing_indicators: true,
            read_receipts: true,
            typing_timeout_ms: default_typing_timeout(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_api_prefix(),
            auth_required: false,
            cors_allow_any: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "huddle.toml",
            "/etc/huddle/huddle.toml",
            "~/.config/huddle/huddle.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid host:port")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.fanout.backend, FanOutBackend::Redis);
        assert!(config.features.typing_indicators);
        assert!(config.features.read_receipts);
        assert!(config.api.enabled);
    }

    #[test]
    fn test_config_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr();
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [fanout]
            backend = "memory"
            namespace = "staging"

            [features]
            typing_indicators = false
            typing_timeout_ms = 2500

            [api]
            auth_required = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.fanout.backend, FanOutBackend::Memory);
        assert_eq!(config.fanout.namespace, "staging");
        assert!(!config.features.typing_indicators);
        assert_eq!(config.features.typing_timeout(), Duration::from_millis(2500));
        assert!(config.api.auth_required);
    }
}
