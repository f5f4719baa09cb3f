use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::discovery::DiscoveryConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub catalog_search: CatalogSearchConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared secret expected in `Authorization: Mutual <secret>`
    /// (required when method = "shared_secret").
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    SharedSecret,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::SharedSecret => "shared_secret",
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("animerate.db")
}

/// Key-value cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Redis connection URL (required when backend = "redis").
    #[serde(default)]
    pub redis_url: Option<String>,
    /// How long a loaded title stays memoized (seconds).
    #[serde(default = "default_title_ttl")]
    pub title_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            title_ttl_secs: default_title_ttl(),
        }
    }
}

fn default_title_ttl() -> u64 {
    3600
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

/// External catalog lookup (AniList GraphQL) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSearchConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for CatalogSearchConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: SanitizedCacheConfig,
    pub discovery: DiscoveryConfig,
    pub catalog_search: CatalogSearchConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub secret_configured: bool,
}

/// Cache config without the connection URL (it may embed credentials).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCacheConfig {
    pub backend: String,
    pub redis_configured: bool,
    pub title_ttl_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method.as_str().to_string(),
                secret_configured: config
                    .auth
                    .secret
                    .as_ref()
                    .is_some_and(|s| !s.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            cache: SanitizedCacheConfig {
                backend: config.cache.backend.as_str().to_string(),
                redis_configured: config.cache.redis_url.is_some(),
                title_ttl_secs: config.cache.title_ttl_secs,
            },
            discovery: config.discovery.clone(),
            catalog_search: config.catalog_search.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_valid_config_with_none_auth() {
        let toml = r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_defaults() {
        let toml = r#"
[auth]
method = "none"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "animerate.db");
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.title_ttl_secs, 3600);
        assert!(!config.discovery.enabled);
        assert_eq!(config.discovery.interval_minutes, 15);
        assert_eq!(config.catalog_search.url, "https://graphql.anilist.co");
        assert_eq!(config.catalog_search.timeout_secs, 30);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[auth]
method = "shared_secret"
secret = "bot-password"

[cache]
backend = "redis"
redis_url = "redis://localhost:6379"
title_ttl_secs = 600

[discovery]
enabled = true
feed_url = "https://example.org/rss"
interval_minutes = 30

[catalog_search]
url = "http://localhost:4000/graphql"
timeout_secs = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::SharedSecret);
        assert_eq!(config.auth.secret.as_deref(), Some("bot-password"));
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.title_ttl_secs, 600);
        assert!(config.discovery.enabled);
        assert_eq!(config.discovery.interval_minutes, 30);
        assert_eq!(config.catalog_search.timeout_secs, 5);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let config: Config = toml::from_str(
            r#"
[auth]
method = "shared_secret"
secret = "bot-password"

[cache]
backend = "redis"
redis_url = "redis://:hunter2@localhost:6379"
"#,
        )
        .unwrap();

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "shared_secret");
        assert!(sanitized.auth.secret_configured);
        assert_eq!(sanitized.cache.backend, "redis");
        assert!(sanitized.cache.redis_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("bot-password"));
        assert!(!json.contains("hunter2"));
    }
}
