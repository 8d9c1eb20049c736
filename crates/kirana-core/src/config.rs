use crate::app_config::{AppConfig, Environment};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected true/false, got {other:?}"),
            }),
        }
    };

    let env = parse_environment(&or_default("KIRANA_ENV", "development"));
    let base_url = or_default("KIRANA_BASE_URL", "https://blinkit.com");
    let bind_addr = parse_addr("KIRANA_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("KIRANA_LOG_LEVEL", "info");
    let user_agent = or_default(
        "KIRANA_USER_AGENT",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15",
    );
    let session_path = PathBuf::from(or_default("KIRANA_SESSION_PATH", "./.kirana_session.json"));
    let country_code = or_default("KIRANA_COUNTRY_CODE", "91");

    let request_timeout_secs = parse_u64("KIRANA_REQUEST_TIMEOUT_SECS", "30")?;
    let wait_timeout_secs = parse_u64("KIRANA_WAIT_TIMEOUT_SECS", "30")?;
    let inter_request_delay_ms = parse_u64("KIRANA_INTER_REQUEST_DELAY_MS", "1000")?;
    let max_retries = parse_u32("KIRANA_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("KIRANA_RETRY_BACKOFF_BASE_MS", "1000")?;
    let default_max_per_item = parse_u32("KIRANA_DEFAULT_MAX_PER_ITEM", "10")?;
    let geo_lookup = parse_bool("KIRANA_GEO_LOOKUP", "true")?;

    Ok(AppConfig {
        env,
        base_url,
        bind_addr,
        log_level,
        user_agent,
        session_path,
        country_code,
        request_timeout_secs,
        wait_timeout_secs,
        inter_request_delay_ms,
        max_retries,
        retry_backoff_base_ms,
        default_max_per_item,
        geo_lookup,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn parse_environment_production() {
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("staging"), Environment::Development);
    }

    #[test]
    fn empty_env_yields_defaults() {
        let map: HashMap<&str, &str> = HashMap::new();
        let config = build_app_config(lookup_from_map(&map)).expect("defaults should parse");
        assert_eq!(config.base_url, "https://blinkit.com");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff_base_ms, 1_000);
        assert_eq!(config.default_max_per_item, 10);
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.geo_lookup);
    }

    #[test]
    fn overrides_are_honored() {
        let mut map = HashMap::new();
        map.insert("KIRANA_BASE_URL", "http://localhost:9999");
        map.insert("KIRANA_MAX_RETRIES", "1");
        map.insert("KIRANA_BIND_ADDR", "127.0.0.1:8080");
        let config = build_app_config(lookup_from_map(&map)).expect("valid overrides");
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn invalid_numeric_value_is_rejected() {
        let mut map = HashMap::new();
        map.insert("KIRANA_MAX_RETRIES", "lots");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KIRANA_MAX_RETRIES"),
            "expected InvalidEnvVar(KIRANA_MAX_RETRIES), got: {result:?}"
        );
    }

    #[test]
    fn invalid_bool_value_is_rejected() {
        let mut map = HashMap::new();
        map.insert("KIRANA_GEO_LOOKUP", "maybe");
        let result = build_app_config(lookup_from_map(&map));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KIRANA_GEO_LOOKUP"
        ));
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let mut map = HashMap::new();
        map.insert("KIRANA_BIND_ADDR", "not-an-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KIRANA_BIND_ADDR"
        ));
    }
}
