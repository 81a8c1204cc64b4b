//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Placeholder substituted with the postal code in `postal.url_template`
pub const CEP_PLACEHOLDER: &str = "{cep}";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_server_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// GraphQL endpoint of the users API
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    /// Request timeout in milliseconds (0 disables)
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_graphql_url() -> String {
    "http://users-api:8001/graphql".to_string()
}

fn default_backend_timeout_ms() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { graphql_url: default_graphql_url(), timeout_ms: default_backend_timeout_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostalConfig {
    /// Lookup URL; `{cep}` is replaced with the requested postal code
    #[serde(default = "default_url_template")]
    pub url_template: String,
    /// Request timeout in milliseconds (0 disables)
    #[serde(default = "default_postal_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_url_template() -> String {
    "https://viacep.com.br/ws/{cep}/json/".to_string()
}

fn default_postal_timeout_ms() -> u64 {
    5_000
}

impl Default for PostalConfig {
    fn default() -> Self {
        Self { url_template: default_url_template(), timeout_ms: default_postal_timeout_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interval of the periodic `metrics` log line (0 disables)
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub postal: PostalConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    graphql_url: String,
    backend_timeout_ms: u64,
    postal_url_template: String,
    postal_timeout_ms: u64,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            graphql_url: toml_config.backend.graphql_url,
            backend_timeout_ms: toml_config.backend.timeout_ms,
            postal_url_template: toml_config.postal.url_template,
            postal_timeout_ms: toml_config.postal.timeout_ms,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if !toml_config.postal.url_template.contains(CEP_PLACEHOLDER) {
            anyhow::bail!(
                "postal.url_template in {} must contain {}",
                path.display(),
                CEP_PLACEHOLDER
            );
        }

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - resolves the path from args/env, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    /// Load configuration from an explicit path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        timeout_from_ms(self.backend_timeout_ms)
    }

    pub fn postal_url_template(&self) -> &str {
        &self.postal_url_template
    }

    pub fn postal_timeout(&self) -> Option<Duration> {
        timeout_from_ms(self.postal_timeout_ms)
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to point both upstreams elsewhere (tests, local runs)
    pub fn with_upstreams(mut self, graphql_url: &str, postal_url_template: &str) -> Self {
        self.graphql_url = graphql_url.to_string();
        self.postal_url_template = postal_url_template.to_string();
        self
    }
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
