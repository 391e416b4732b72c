//! Auth routes: sign-up, sign-in, federated sign-in, logout, username and
//! password-reset flows, and the caller's own auth state.
//!
//! ERROR HANDLING
//! ==============
//! Every handler returns `ApiError` on failure: a status from
//! `session_error_to_status` and a JSON body `{"error": code, "message": msg}`.
//! Provider messages reach the client verbatim; profile-store details are
//! logged and replaced with a generic message.

use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::identity::{AccountIdentity, FederatedCredential, IdentityErrorKind};
use crate::profiles::{ProfileStoreError, UserProfile};
use crate::services::coordinator::SessionError;
use crate::services::observer::AuthState;
use crate::services::session;
use crate::state::AppState;

/// Interactive username minimum. Derived usernames are exempt.
pub const MIN_USERNAME_LEN: usize = 3;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.code, "message": self.message }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = session_error_to_status(&err);
        let message = match &err {
            SessionError::ProfileStore(ProfileStoreError::UsernameConflict(_)) => "Username is already taken".to_owned(),
            SessionError::ProfileStore(e) => {
                tracing::error!(error = %e, "profile store failure");
                "Profile store unavailable".to_owned()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, code = other.error_code(), "identity service failure");
                }
                other.to_string()
            }
        };
        Self::new(status, err.error_code(), message)
    }
}

pub(crate) fn session_error_to_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::UsernameTaken { .. } => StatusCode::CONFLICT,
        SessionError::NotSignedIn => StatusCode::UNAUTHORIZED,
        SessionError::ProfileExists { .. } => StatusCode::CONFLICT,
        SessionError::ProfileStore(ProfileStoreError::UsernameConflict(_)) => StatusCode::CONFLICT,
        SessionError::ProfileStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::IdentityService(e) => match e.kind() {
            IdentityErrorKind::DuplicateEmail => StatusCode::CONFLICT,
            IdentityErrorKind::InvalidEmail | IdentityErrorKind::WeakPassword | IdentityErrorKind::FederatedCancelled => {
                StatusCode::BAD_REQUEST
            }
            IdentityErrorKind::InvalidCredentials | IdentityErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
            IdentityErrorKind::UserDisabled => StatusCode::FORBIDDEN,
            IdentityErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            IdentityErrorKind::Network | IdentityErrorKind::Other => StatusCode::BAD_GATEWAY,
        },
    }
}

fn check_username_length(username: &str) -> Result<(), ApiError> {
    if username.trim().chars().count() < MIN_USERNAME_LEN {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "E_USERNAME_TOO_SHORT",
            format!("Username must be at least {MIN_USERNAME_LEN} characters"),
        ));
    }
    Ok(())
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Identity behind the request's session cookie, resolved with the identity
/// provider. Use as a handler parameter to require a live session.
pub struct AuthUser {
    pub identity: AccountIdentity,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = session::token(&jar).ok_or(SessionError::NotSignedIn)?;

        let app_state = AppState::from_ref(state);
        let identity = app_state
            .coordinator
            .current_identity(token)
            .await?
            .ok_or(SessionError::NotSignedIn)?;

        Ok(Self { identity })
    }
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================

#[derive(Deserialize)]
pub struct SignUpBody {
    email: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct SignInBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct UsernameBody {
    username: String,
}

#[derive(Deserialize)]
pub struct PasswordResetBody {
    email: String,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    username: String,
}

#[derive(Debug, Serialize)]
pub struct Availability {
    pub username: String,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthStateResponse {
    #[serde(flatten)]
    pub state: AuthState,
    pub needs_username: bool,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/sign-up`: create account + profile, set session cookie.
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignUpBody>,
) -> Result<(CookieJar, Json<AccountIdentity>), ApiError> {
    check_username_length(&body.username)?;
    let (jar, identity) = state
        .coordinator
        .sign_up(jar, &body.email, body.username.trim(), &body.password)
        .await?;
    Ok((jar, Json(identity)))
}

/// `POST /api/auth/sign-in`: verify email/password, set session cookie.
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignInBody>,
) -> Result<(CookieJar, Json<AccountIdentity>), ApiError> {
    let (jar, identity) = state.coordinator.sign_in(jar, &body.email, &body.password).await?;
    Ok((jar, Json(identity)))
}

/// `POST /api/auth/google`: exchange a Google credential, set session cookie.
pub async fn google(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credential): Json<FederatedCredential>,
) -> Result<(CookieJar, Json<AccountIdentity>), ApiError> {
    let (jar, identity) = state.coordinator.sign_in_with_google(jar, &credential).await?;
    Ok((jar, Json(identity)))
}

/// `POST /api/auth/logout`: sign out, clear cookie. Succeeds without a session.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, StatusCode), ApiError> {
    let jar = state.coordinator.logout(jar).await?;
    Ok((jar, StatusCode::NO_CONTENT))
}

/// `GET /api/auth/username-available?username=`
pub async fn username_available(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, ApiError> {
    let available = state
        .coordinator
        .check_username_availability(&query.username)
        .await?;
    Ok(Json(Availability { username: query.username, available }))
}

/// `POST /api/auth/username`: claim a username for a signed-in identity.
pub async fn set_username(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<UsernameBody>,
) -> Result<Json<UserProfile>, ApiError> {
    check_username_length(&body.username)?;
    let profile = state
        .coordinator
        .set_username(session::token(&jar), body.username.trim())
        .await?;
    Ok(Json(profile))
}

/// `POST /api/auth/password-reset`
pub async fn password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetBody>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.send_password_reset(&body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`: the caller's profile, synthesized if missing.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Json<UserProfile> {
    Json(state.coordinator.profile_view(&auth.identity).await)
}

/// `GET /api/auth/state`: resolved auth state for the request's credential.
pub async fn auth_state(State(state): State<AppState>, jar: CookieJar) -> Result<Json<AuthStateResponse>, ApiError> {
    let identity = match session::token(&jar) {
        Some(token) => state.coordinator.current_identity(token).await?,
        None => None,
    };
    let needs_username = match &identity {
        Some(identity) => state.coordinator.needs_username(&identity.uid).await?,
        None => false,
    };
    Ok(Json(AuthStateResponse { state: AuthState::from_identity(identity), needs_username }))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
