//! Identity types: provider-neutral account records, sessions, and errors.
//!
//! The hosted identity service owns credential storage, verification, and
//! token issuance. Everything here describes what we receive back from it and
//! the closed set of failures we translate its error codes into.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Closed classification of identity-provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityErrorKind {
    /// An account with this email already exists.
    DuplicateEmail,
    /// The email address is malformed or missing.
    InvalidEmail,
    /// The password does not meet the provider's strength policy.
    WeakPassword,
    /// Wrong email/password pair, unknown account, or rejected federated credential.
    InvalidCredentials,
    /// The account exists but has been disabled.
    UserDisabled,
    /// The provider is throttling this client.
    RateLimited,
    /// A bearer token is expired, revoked, or malformed.
    InvalidToken,
    /// The user abandoned the federated flow before completing it.
    FederatedCancelled,
    /// The request never produced a provider answer (DNS, TLS, timeout, 5xx).
    Network,
    /// Anything the provider reported that does not fit the kinds above.
    Other,
}

impl IdentityErrorKind {
    /// Map a provider error code (e.g. `EMAIL_EXISTS`) onto a kind.
    #[must_use]
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "EMAIL_EXISTS" => Self::DuplicateEmail,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "WEAK_PASSWORD" | "MISSING_PASSWORD" => Self::WeakPassword,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE"
            | "USER_NOT_FOUND" => Self::InvalidCredentials,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => Self::RateLimited,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => {
                Self::InvalidToken
            }
            "POPUP_CLOSED_BY_USER" | "CANCELLED_POPUP_REQUEST" | "MISSING_IDP_CREDENTIAL" => {
                Self::FederatedCancelled
            }
            _ => Self::Other,
        }
    }
}

/// Errors produced by identity-provider operations.
///
/// `Display` is always the provider's own message, passed through verbatim,
/// so it can be shown to the end user as-is.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The provider answered and rejected the request.
    #[error("{message}")]
    Provider { kind: IdentityErrorKind, code: String, message: String },

    /// The HTTP request to the provider failed before an answer arrived.
    #[error("{0}")]
    Request(String),

    /// The provider answered with something we could not parse.
    #[error("{0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },
}

impl IdentityError {
    /// Build a provider rejection from its raw error code and message.
    #[must_use]
    pub fn provider(code: &str, message: impl Into<String>) -> Self {
        Self::Provider { kind: IdentityErrorKind::from_provider_code(code), code: code.to_owned(), message: message.into() }
    }

    #[must_use]
    pub fn kind(&self) -> IdentityErrorKind {
        match self {
            Self::Provider { kind, .. } => *kind,
            Self::Request(_) => IdentityErrorKind::Network,
            Self::Parse(_) | Self::HttpClientBuild(_) | Self::MissingApiKey { .. } => IdentityErrorKind::Other,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            IdentityErrorKind::DuplicateEmail => "E_DUPLICATE_EMAIL",
            IdentityErrorKind::InvalidEmail => "E_INVALID_EMAIL",
            IdentityErrorKind::WeakPassword => "E_WEAK_PASSWORD",
            IdentityErrorKind::InvalidCredentials => "E_INVALID_CREDENTIALS",
            IdentityErrorKind::UserDisabled => "E_USER_DISABLED",
            IdentityErrorKind::RateLimited => "E_RATE_LIMITED",
            IdentityErrorKind::InvalidToken => "E_INVALID_TOKEN",
            IdentityErrorKind::FederatedCancelled => "E_FEDERATED_CANCELLED",
            IdentityErrorKind::Network => "E_IDENTITY_UNREACHABLE",
            IdentityErrorKind::Other => "E_IDENTITY_SERVICE",
        }
    }
}

// =============================================================================
// ACCOUNT RECORDS
// =============================================================================

/// Externally owned authentication record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Provider-assigned unique id. Doubles as the profile primary key.
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Linked provider ids (`password`, `google.com`, ...).
    #[serde(default)]
    pub providers: Vec<String>,
}

/// Result of a successful register/authenticate call: the identity plus the
/// provider's tokens for it.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub identity: AccountIdentity,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

/// Credential obtained by the client from a federated provider (e.g. the
/// Google sign-in popup) and handed to us for exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FederatedCredential {
    #[serde(default = "default_federated_provider")]
    pub provider_id: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

pub const GOOGLE_PROVIDER_ID: &str = "google.com";

fn default_federated_provider() -> String {
    GOOGLE_PROVIDER_ID.to_owned()
}

impl FederatedCredential {
    #[must_use]
    pub fn google(id_token: impl Into<String>) -> Self {
        Self { provider_id: GOOGLE_PROVIDER_ID.to_owned(), id_token: Some(id_token.into()), access_token: None }
    }

    /// True when neither token is present; such a credential can only mean
    /// the user closed the federated flow.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_token.as_deref().is_none_or(str::is_empty) && self.access_token.as_deref().is_none_or(str::is_empty)
    }
}

// =============================================================================
// IDENTITY PROVIDER TRAIT
// =============================================================================

/// Hosted identity service, as consumed by the session layer. Enables faking
/// in tests.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account.
    async fn register(&self, email: &str, password: &str) -> Result<ProviderSession, IdentityError>;

    /// Verify an email/password pair.
    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, IdentityError>;

    /// Exchange a federated credential for an account, creating it on first use.
    async fn authenticate_federated(&self, credential: &FederatedCredential) -> Result<ProviderSession, IdentityError>;

    /// Produce a bearer token for the session's identity.
    async fn issue_token(&self, session: &ProviderSession) -> Result<String, IdentityError>;

    /// Set the account's display name. `id_token` identifies the account.
    async fn update_display_name(&self, id_token: &str, display_name: &str) -> Result<(), IdentityError>;

    /// Resolve the identity a bearer token belongs to. `Ok(None)` when the
    /// provider rejects the token.
    async fn current_identity(&self, id_token: &str) -> Result<Option<AccountIdentity>, IdentityError>;

    /// End the provider-side session, if the provider keeps one.
    async fn sign_out(&self, id_token: Option<&str>) -> Result<(), IdentityError>;

    /// Ask the provider to email a password-reset link.
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
