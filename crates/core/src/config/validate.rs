use super::{
    types::{AuthMethod, CacheBackend, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - Server port is not 0
/// - Shared secret auth has a non-empty secret
/// - Redis cache has a connection URL
/// - Enabled discovery has a feed URL and an interval that tiles the day
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::SharedSecret
        && config.auth.secret.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.secret must be set when using shared_secret auth".to_string(),
        ));
    }

    if config.cache.backend == CacheBackend::Redis && config.cache.redis_url.is_none() {
        return Err(ConfigError::ValidationError(
            "cache.redis_url must be set when using the redis backend".to_string(),
        ));
    }

    let discovery = &config.discovery;
    if discovery.enabled {
        if discovery.feed_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery.feed_url must be set when discovery is enabled".to_string(),
            ));
        }
        if discovery.interval_minutes == 0 || (24 * 60) % discovery.interval_minutes != 0 {
            return Err(ConfigError::ValidationError(format!(
                "discovery.interval_minutes must divide a day evenly, got {}",
                discovery.interval_minutes
            )));
        }
        if discovery.match_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "discovery.match_concurrency cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn parse(toml: &str) -> Config {
        load_config_from_str(toml).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = parse("[auth]\nmethod = \"none\"\n");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = parse("[auth]\nmethod = \"none\"\n[server]\nport = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_shared_secret_requires_secret() {
        let config = parse("[auth]\nmethod = \"shared_secret\"\n");
        assert!(validate_config(&config).is_err());

        let config = parse("[auth]\nmethod = \"shared_secret\"\nsecret = \"\"\n");
        assert!(validate_config(&config).is_err());

        let config = parse("[auth]\nmethod = \"shared_secret\"\nsecret = \"pw\"\n");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_redis_requires_url() {
        let config = parse("[auth]\nmethod = \"none\"\n[cache]\nbackend = \"redis\"\n");
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_discovery() {
        let config = parse("[auth]\nmethod = \"none\"\n[discovery]\nenabled = true\n");
        assert!(validate_config(&config).is_err());

        let config = parse(
            "[auth]\nmethod = \"none\"\n[discovery]\nenabled = true\nfeed_url = \"https://example.org/rss\"\ninterval_minutes = 7\n",
        );
        assert!(validate_config(&config).is_err());

        let config = parse(
            "[auth]\nmethod = \"none\"\n[discovery]\nenabled = true\nfeed_url = \"https://example.org/rss\"\ninterval_minutes = 20\n",
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_disabled_discovery_ignores_feed_url() {
        let config = parse("[auth]\nmethod = \"none\"\n[discovery]\nenabled = false\n");
        assert!(validate_config(&config).is_ok());
    }
}
