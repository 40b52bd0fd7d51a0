use std::path::PathBuf;

use crate::app_config::{AppConfig, CrawlerSettings, Environment, StoreCredential};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it from a
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PLUGDB_ENV", "development"))?;
    let log_level = or_default("PLUGDB_LOG_LEVEL", "info");

    let anon_credential = optional("PLUGDB_ANON_KEY")
        .map(|raw| parse_credential("PLUGDB_ANON_KEY", &raw))
        .transpose()?;
    let service_credential = optional("PLUGDB_SERVICE_KEY")
        .map(|raw| parse_credential("PLUGDB_SERVICE_KEY", &raw))
        .transpose()?;

    let db_max_connections = parse_u32("PLUGDB_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("PLUGDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PLUGDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let headless = parse_bool(
        "PLUGDB_BROWSER_HEADLESS",
        &or_default("PLUGDB_BROWSER_HEADLESS", "true"),
    )?;
    let chrome_path = optional("PLUGDB_CHROME_PATH").map(PathBuf::from);
    let browser_ws_url = optional("PLUGDB_BROWSER_WS_URL");
    let navigation_timeout_secs = parse_u64("PLUGDB_NAVIGATION_TIMEOUT_SECS", "30")?;
    let selector_timeout_secs = parse_u64("PLUGDB_SELECTOR_TIMEOUT_SECS", "10")?;
    let max_page_errors = parse_usize("PLUGDB_MAX_PAGE_ERRORS", "3")?;
    let max_scrolls = parse_usize("PLUGDB_MAX_SCROLLS", "50")?;
    let min_delay_ms = parse_u64("PLUGDB_MIN_DELAY_MS", "1500")?;
    let max_delay_ms = parse_u64("PLUGDB_MAX_DELAY_MS", "3000")?;

    if min_delay_ms > max_delay_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "PLUGDB_MIN_DELAY_MS".to_string(),
            reason: format!("{min_delay_ms} exceeds PLUGDB_MAX_DELAY_MS ({max_delay_ms})"),
        });
    }

    if max_page_errors == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PLUGDB_MAX_PAGE_ERRORS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        anon_credential,
        service_credential,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        crawler: CrawlerSettings {
            headless,
            chrome_path,
            browser_ws_url,
            navigation_timeout_secs,
            selector_timeout_secs,
            max_page_errors,
            max_scrolls,
            min_delay_ms,
            max_delay_ms,
        },
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PLUGDB_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

/// Splits a `role:secret` credential. The secret may itself contain `:`.
fn parse_credential(var: &str, raw: &str) -> Result<StoreCredential, ConfigError> {
    let invalid = || ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: "expected role:secret".to_string(),
    };

    let (role, secret) = raw.split_once(':').ok_or_else(invalid)?;
    if role.is_empty() || secret.is_empty() {
        return Err(invalid());
    }

    Ok(StoreCredential {
        role: role.to_string(),
        secret: secret.to_string(),
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
