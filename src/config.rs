// Configuration loading with YAML file + environment overrides.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "WINGSUITE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/wingsuite.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the workflow backend, e.g. `http://127.0.0.1:5678`.
    pub base_url: String,
    /// Separate base for webhook endpoints when the backend exposes them
    /// on a different host. Falls back to `base_url`.
    #[serde(default)]
    pub webhook_base_url: Option<String>,
    pub timeout_s: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5678".to_string(),
            webhook_base_url: None,
            timeout_s: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn webhook_base(&self) -> &str {
        self.webhook_base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.base_url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Marks the session cookie `Secure`. Disable only for local HTTP.
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_secure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub folder_ttl_s: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { folder_ttl_s: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    pub allow_origins: Option<Vec<String>>,
    pub allow_credentials: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from `WINGSUITE_CONFIG_PATH` (or the default
    /// path) and applies environment overrides. A missing file yields the
    /// defaults; an unreadable or invalid file is a startup error.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load_from_path(Path::new(&path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config failed: {}", path.display()))?;
        let config = serde_yaml::from_str(&raw)
            .with_context(|| format!("parse config failed: {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = non_empty_env("WINGSUITE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty_env("WINGSUITE_PORT").and_then(|value| value.parse().ok()) {
            self.server.port = port;
        }
        if let Some(base) = non_empty_env("WINGSUITE_UPSTREAM_URL") {
            self.upstream.base_url = base;
        }
        if let Some(base) = non_empty_env("WINGSUITE_WEBHOOK_URL") {
            self.upstream.webhook_base_url = Some(base);
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.server.port, 8600);
        assert_eq!(config.cache.folder_ttl_s, 30);
        assert!(config.session.cookie_secure);
        assert_eq!(config.upstream.webhook_base(), "http://127.0.0.1:5678");
    }

    #[test]
    fn webhook_base_falls_back_to_base_url() {
        let mut upstream = UpstreamConfig::default();
        upstream.base_url = "http://backend:5678".to_string();
        upstream.webhook_base_url = Some("   ".to_string());
        assert_eq!(upstream.webhook_base(), "http://backend:5678");

        upstream.webhook_base_url = Some("http://hooks:5679".to_string());
        assert_eq!(upstream.webhook_base(), "http://hooks:5679");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from_path(Path::new("/nonexistent/wingsuite.yaml")).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn partial_yaml_keeps_section_defaults() {
        let raw = "server:\n  host: 127.0.0.1\n  port: 9000\n";
        let config: Config = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cache.folder_ttl_s, 30);
    }
}
