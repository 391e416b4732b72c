//! Process configuration parsed from environment variables.
//!
//! Identity-provider settings live in [`crate::identity::config`]; this module
//! covers the listener, the profile database, the session cookie, and the
//! route gate. Parsing runs over a lookup function so tests can supply their
//! own variables without touching the process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::{DEFAULT_DB_ACQUIRE_TIMEOUT_SECS, DEFAULT_DB_MAX_CONNECTIONS, DbConfig};
use crate::gate::{DEFAULT_PROTECTED_HOME, DEFAULT_PUBLIC_ENTRY, GateConfig, GateRoutes};
use crate::services::session::CookiePolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "./public";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database: DbConfig,
    pub cookies: CookiePolicy,
    pub gate: GateConfig,
    /// Presentation assets served for any path the API does not claim.
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `DB_ACQUIRE_TIMEOUT_SECS`: default 5
    /// - `COOKIE_SECURE`: default inferred from `IDENTITY_REQUEST_URI` being https
    /// - `GATE_PUBLIC_ENTRY`: default `/sign-up`
    /// - `GATE_PROTECTED_HOME`: default `/dashboard`
    /// - `GATE_VERIFY_TOKENS`: default false
    /// - `STATIC_DIR`: default `./public`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = lookup_parse(&lookup, "PORT", DEFAULT_PORT)?;

        let max_connections = lookup_parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid { var: "DB_MAX_CONNECTIONS", value: "0".to_owned() });
        }
        let database = DbConfig {
            url: database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(lookup_parse(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )?),
        };

        let secure = cookie_secure(
            lookup_bool(&lookup, "COOKIE_SECURE")?,
            lookup("IDENTITY_REQUEST_URI").as_deref(),
        );

        let routes = GateRoutes::new(
            route_path(&lookup, "GATE_PUBLIC_ENTRY", DEFAULT_PUBLIC_ENTRY)?,
            route_path(&lookup, "GATE_PROTECTED_HOME", DEFAULT_PROTECTED_HOME)?,
        );
        let verify_tokens = lookup_bool(&lookup, "GATE_VERIFY_TOKENS")?.unwrap_or(false);

        let static_dir = lookup("STATIC_DIR")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from);

        Ok(Self {
            port,
            database,
            cookies: CookiePolicy { secure },
            gate: GateConfig { routes, verify_tokens },
            static_dir,
        })
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive and trimmed.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn lookup_parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn lookup_bool(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<bool>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or(ConfigError::Invalid { var, value: raw }),
    }
}

/// Explicit setting wins; otherwise secure when the public origin is https.
pub(crate) fn cookie_secure(explicit: Option<bool>, request_uri: Option<&str>) -> bool {
    explicit.unwrap_or_else(|| request_uri.is_some_and(|uri| uri.starts_with("https://")))
}

fn route_path(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
) -> Result<String, ConfigError> {
    match lookup(var) {
        None => Ok(default.to_owned()),
        Some(raw) => {
            let path = raw.trim().trim_end_matches('/');
            if path.starts_with('/') && path.len() > 1 {
                Ok(path.to_owned())
            } else {
                Err(ConfigError::Invalid { var, value: raw })
            }
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
