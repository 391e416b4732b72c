//! Identity toolkit REST client.
//!
//! Thin HTTP wrapper over the hosted identity service's `accounts:*` endpoints
//! and its secure-token exchange. Response parsing lives in pure functions so
//! it can be tested without a network.
//!
//! ERROR HANDLING
//! ==============
//! Every non-success answer is funnelled through `parse_error_body`, which
//! keeps the provider message verbatim and classifies its leading code. No
//! call is retried here.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::config::IdentityConfig;
use super::types::{AccountIdentity, FederatedCredential, IdentityError, IdentityProvider, ProviderSession};

pub const PASSWORD_PROVIDER_ID: &str = "password";

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirebaseIdentity {
    http: reqwest::Client,
    config: IdentityConfig,
}

impl FirebaseIdentity {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| IdentityError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Build a client from `IDENTITY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, IdentityError> {
        Self::new(IdentityConfig::from_env()?)
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<String, IdentityError> {
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_error_body(status, &text));
        }
        Ok(text)
    }

    async fn accounts(&self, method: &str, body: serde_json::Value) -> Result<String, IdentityError> {
        self.post(accounts_url(&self.config, method), body).await
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn register(&self, email: &str, password: &str) -> Result<ProviderSession, IdentityError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let text = self.accounts("signUp", body).await?;
        parse_auth_response(&text, PASSWORD_PROVIDER_ID)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, IdentityError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let text = self.accounts("signInWithPassword", body).await?;
        parse_auth_response(&text, PASSWORD_PROVIDER_ID)
    }

    async fn authenticate_federated(&self, credential: &FederatedCredential) -> Result<ProviderSession, IdentityError> {
        if credential.is_empty() {
            return Err(IdentityError::provider("MISSING_IDP_CREDENTIAL", "MISSING_IDP_CREDENTIAL"));
        }
        let body = json!({
            "postBody": federated_post_body(credential),
            "requestUri": self.config.request_uri,
            "returnSecureToken": true,
            "returnIdpCredential": true,
        });
        let text = self.accounts("signInWithIdp", body).await?;
        parse_auth_response(&text, &credential.provider_id)
    }

    async fn issue_token(&self, session: &ProviderSession) -> Result<String, IdentityError> {
        if !session.id_token.is_empty() {
            return Ok(session.id_token.clone());
        }
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(IdentityError::provider("INVALID_REFRESH_TOKEN", "INVALID_REFRESH_TOKEN"));
        };
        let url = format!("{}?key={}", self.config.token_url, self.config.api_key);
        let body = json!({ "grant_type": "refresh_token", "refresh_token": refresh_token });
        let text = self.post(url, body).await?;
        parse_refresh_response(&text)
    }

    async fn update_display_name(&self, id_token: &str, display_name: &str) -> Result<(), IdentityError> {
        let body = json!({ "idToken": id_token, "displayName": display_name, "returnSecureToken": false });
        self.accounts("update", body).await?;
        Ok(())
    }

    async fn current_identity(&self, id_token: &str) -> Result<Option<AccountIdentity>, IdentityError> {
        match self.accounts("lookup", json!({ "idToken": id_token })).await {
            Ok(text) => parse_lookup_response(&text),
            Err(e) if e.kind() == super::IdentityErrorKind::InvalidToken => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self, _id_token: Option<&str>) -> Result<(), IdentityError> {
        // ID tokens are stateless on the provider side; revocation needs admin
        // credentials, so signing out only drops our copy of the token.
        tracing::debug!("identity sign-out is local to this session");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        self.accounts("sendOobCode", body).await?;
        Ok(())
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

pub(crate) fn accounts_url(config: &IdentityConfig, method: &str) -> String {
    format!("{}/accounts:{method}?key={}", config.base_url, config.api_key)
}

/// Form-encoded `postBody` for a federated exchange.
pub(crate) fn federated_post_body(credential: &FederatedCredential) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(id_token) = credential.id_token.as_deref().filter(|t| !t.is_empty()) {
        parts.push(format!("id_token={id_token}"));
    }
    if let Some(access_token) = credential.access_token.as_deref().filter(|t| !t.is_empty()) {
        parts.push(format!("access_token={access_token}"));
    }
    parts.push(format!("providerId={}", credential.provider_id));
    parts.join("&")
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Turn a non-success response into an [`IdentityError`].
///
/// The provider's message looks like `CODE` or `CODE : human text`; the code
/// drives classification, the whole message is kept for display.
pub(crate) fn parse_error_body(status: u16, body: &str) -> IdentityError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message;
            let code = message.split(" : ").next().unwrap_or_default().trim().to_owned();
            IdentityError::provider(&code, message)
        }
        Err(_) if status >= 500 => IdentityError::Request(format!("identity service unavailable (status {status})")),
        Err(_) => IdentityError::Parse(format!("unexpected error response (status {status}): {body}")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    provider_id: Option<String>,
}

pub(crate) fn parse_auth_response(body: &str, default_provider: &str) -> Result<ProviderSession, IdentityError> {
    let resp: AuthResponse = serde_json::from_str(body).map_err(|e| IdentityError::Parse(e.to_string()))?;
    let provider = resp.provider_id.unwrap_or_else(|| default_provider.to_owned());
    Ok(ProviderSession {
        identity: AccountIdentity {
            uid: resp.local_id,
            email: resp.email.filter(|e| !e.is_empty()),
            display_name: resp.display_name.filter(|n| !n.is_empty()),
            providers: vec![provider],
        },
        id_token: resp.id_token,
        refresh_token: resp.refresh_token,
    })
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
}

pub(crate) fn parse_refresh_response(body: &str) -> Result<String, IdentityError> {
    let resp: RefreshResponse = serde_json::from_str(body).map_err(|e| IdentityError::Parse(e.to_string()))?;
    Ok(resp.id_token)
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    provider_user_info: Vec<ProviderInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderInfo {
    provider_id: String,
}

pub(crate) fn parse_lookup_response(body: &str) -> Result<Option<AccountIdentity>, IdentityError> {
    let resp: LookupResponse = serde_json::from_str(body).map_err(|e| IdentityError::Parse(e.to_string()))?;
    Ok(resp.users.into_iter().next().map(|u| AccountIdentity {
        uid: u.local_id,
        email: u.email.filter(|e| !e.is_empty()),
        display_name: u.display_name.filter(|n| !n.is_empty()),
        providers: u.provider_user_info.into_iter().map(|p| p.provider_id).collect(),
    }))
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
