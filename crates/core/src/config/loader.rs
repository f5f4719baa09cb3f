//! Configuration sources: a TOML file overlaid with `ANIMERATE_*` variables.

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Prefix of environment overrides. Nested keys use `__`, so
/// `ANIMERATE_DISCOVERY__FEED_URL` sets `discovery.feed_url`.
pub const ENV_PREFIX: &str = "ANIMERATE_";

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Read `path` and apply environment overrides on top of it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::from(Toml::file(path)).merge(Env::prefixed(ENV_PREFIX).split("__")))
}

/// Parse a TOML document on its own, ignoring the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    extract(Figment::from(Toml::string(toml_str)))
}
