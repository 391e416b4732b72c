//! Identity provider configuration parsed from environment variables.

use super::types::IdentityError;

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_IDENTITY_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
pub const DEFAULT_IDENTITY_REQUEST_URI: &str = "http://localhost";
pub const DEFAULT_IDENTITY_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDENTITY_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub api_key: String,
    pub base_url: String,
    pub token_url: String,
    /// `requestUri` sent with federated sign-in exchanges.
    pub request_uri: String,
    pub timeouts: IdentityTimeouts,
}

impl IdentityConfig {
    /// Build typed identity config from environment variables.
    ///
    /// Required:
    /// - `IDENTITY_API_KEY`
    ///
    /// Optional:
    /// - `IDENTITY_BASE_URL`: default identity toolkit endpoint (point at an emulator for local work)
    /// - `IDENTITY_TOKEN_URL`: default secure-token endpoint
    /// - `IDENTITY_REQUEST_URI`: default `http://localhost`
    /// - `IDENTITY_REQUEST_TIMEOUT_SECS`: default 30
    /// - `IDENTITY_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or empty.
    pub fn from_env() -> Result<Self, IdentityError> {
        let api_key = std::env::var("IDENTITY_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| IdentityError::MissingApiKey { var: "IDENTITY_API_KEY".into() })?;

        Ok(Self {
            api_key,
            base_url: env_url("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL),
            token_url: env_url("IDENTITY_TOKEN_URL", DEFAULT_IDENTITY_TOKEN_URL),
            request_uri: std::env::var("IDENTITY_REQUEST_URI").unwrap_or_else(|_| DEFAULT_IDENTITY_REQUEST_URI.into()),
            timeouts: IdentityTimeouts {
                request_secs: env_parse_u64("IDENTITY_REQUEST_TIMEOUT_SECS", DEFAULT_IDENTITY_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse_u64("IDENTITY_CONNECT_TIMEOUT_SECS", DEFAULT_IDENTITY_CONNECT_TIMEOUT_SECS),
            },
        })
    }
}

fn env_url(key: &str, default: &str) -> String {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
