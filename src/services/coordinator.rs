//! Session coordinator: sign-up, sign-in, federated sign-in, and sign-out.
//!
//! ARCHITECTURE
//! ============
//! This is the one place where identity-provider calls, profile writes, and
//! username checks are combined. Every path that authenticates installs
//! exactly one session credential into the caller's cookie jar, replacing
//! whatever was there.
//!
//! ERROR HANDLING
//! ==============
//! Sign-up and first federated sign-in perform several remote writes with no
//! transaction around them (identity, token, display name, profile). Each
//! write is a named `ProvisionStep`; when a step fails after the identity
//! exists but before its profile is written, the failure is logged with the
//! uid so the orphan is visible. `sign_in` repairs such orphans by creating
//! the missing profile. Nothing here retries a failed provider call.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, error, info, warn};

use super::session::{self, CookiePolicy, SessionCredential};
use super::username::{AllocatedUsername, UsernameAllocator, base_from_email};
use crate::identity::{AccountIdentity, FederatedCredential, IdentityError, IdentityProvider, ProviderSession};
use crate::profiles::{ProfileStore, ProfileStoreError, UserProfile};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Username is already taken")]
    UsernameTaken { username: String },
    /// Provider failure; displays the provider's message verbatim.
    #[error(transparent)]
    IdentityService(#[from] IdentityError),
    #[error(transparent)]
    ProfileStore(#[from] ProfileStoreError),
    #[error("No user logged in")]
    NotSignedIn,
    /// The identity already owns a profile; usernames are set once.
    #[error("Username already set")]
    ProfileExists { uid: String },
}

impl SessionError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UsernameTaken { .. } => "E_USERNAME_TAKEN",
            Self::IdentityService(e) => e.error_code(),
            Self::ProfileStore(e) => e.error_code(),
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
            Self::ProfileExists { .. } => "E_PROFILE_EXISTS",
        }
    }
}

fn taken_on_conflict(err: ProfileStoreError) -> SessionError {
    match err {
        ProfileStoreError::UsernameConflict(username) => SessionError::UsernameTaken { username },
        other => SessionError::ProfileStore(other),
    }
}

// =============================================================================
// PROVISIONING STEP LOG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CheckUsername,
    CreateIdentity,
    Authenticate,
    IssueCredential,
    SetDisplayName,
    ReadProfile,
    AllocateUsername,
    WriteProfile,
}

impl ProvisionStep {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckUsername => "check_username",
            Self::CreateIdentity => "create_identity",
            Self::Authenticate => "authenticate",
            Self::IssueCredential => "issue_credential",
            Self::SetDisplayName => "set_display_name",
            Self::ReadProfile => "read_profile",
            Self::AllocateUsername => "allocate_username",
            Self::WriteProfile => "write_profile",
        }
    }
}

/// Ordered record of the remote writes one provisioning flow has completed.
struct Provisioning {
    flow: &'static str,
    uid: Option<String>,
    completed: Vec<ProvisionStep>,
}

impl Provisioning {
    fn new(flow: &'static str) -> Self {
        Self { flow, uid: None, completed: Vec::new() }
    }

    fn identity_ready(&mut self, step: ProvisionStep, uid: &str) {
        self.uid = Some(uid.to_owned());
        self.done(step);
    }

    fn done(&mut self, step: ProvisionStep) {
        self.completed.push(step);
    }

    fn fail(&self, step: ProvisionStep, err: impl Into<SessionError>) -> SessionError {
        let err = err.into();
        let steps: Vec<&str> = self.completed.iter().map(|s| s.as_str()).collect();
        match &self.uid {
            Some(uid) if !self.completed.contains(&ProvisionStep::WriteProfile) => error!(
                flow = self.flow,
                %uid,
                step = step.as_str(),
                completed = ?steps,
                error = %err,
                "provisioning stopped before profile write; identity has no profile until next sign-in"
            ),
            _ => warn!(flow = self.flow, step = step.as_str(), completed = ?steps, error = %err, "provisioning step failed"),
        }
        err
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub struct SessionCoordinator {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    usernames: UsernameAllocator,
    cookies: CookiePolicy,
}

impl SessionCoordinator {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>, cookies: CookiePolicy) -> Self {
        let usernames = UsernameAllocator::new(profiles.clone());
        Self { identity, profiles, usernames, cookies }
    }

    #[must_use]
    pub fn cookie_policy(&self) -> CookiePolicy {
        self.cookies
    }

    async fn issue_credential(&self, session: &ProviderSession) -> Result<SessionCredential, IdentityError> {
        let token = self.identity.issue_token(session).await?;
        Ok(SessionCredential::issue(token))
    }

    /// Register an email/password account under `username`.
    ///
    /// # Errors
    ///
    /// `UsernameTaken` if the username is in use, `IdentityService` for any
    /// provider rejection, `ProfileStore` if the profile cannot be written.
    pub async fn sign_up(
        &self,
        jar: CookieJar,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(CookieJar, AccountIdentity), SessionError> {
        let mut run = Provisioning::new("sign_up");

        let available = self
            .usernames
            .is_available(username)
            .await
            .map_err(|e| run.fail(ProvisionStep::CheckUsername, e))?;
        if !available {
            return Err(SessionError::UsernameTaken { username: username.to_owned() });
        }
        run.done(ProvisionStep::CheckUsername);

        let session = self
            .identity
            .register(email, password)
            .await
            .map_err(|e| run.fail(ProvisionStep::CreateIdentity, e))?;
        run.identity_ready(ProvisionStep::CreateIdentity, &session.identity.uid);

        let credential = self
            .issue_credential(&session)
            .await
            .map_err(|e| run.fail(ProvisionStep::IssueCredential, e))?;
        let jar = session::install(jar, &credential, self.cookies);
        run.done(ProvisionStep::IssueCredential);

        self.identity
            .update_display_name(credential.token(), username)
            .await
            .map_err(|e| run.fail(ProvisionStep::SetDisplayName, e))?;
        run.done(ProvisionStep::SetDisplayName);

        let profile = UserProfile::new(&session.identity.uid, username, email);
        self.profiles
            .put(&profile)
            .await
            .map_err(|e| run.fail(ProvisionStep::WriteProfile, taken_on_conflict(e)))?;
        run.done(ProvisionStep::WriteProfile);

        let mut identity = session.identity;
        identity.display_name = Some(username.to_owned());
        info!(uid = %identity.uid, %username, "account created");
        Ok((jar, identity))
    }

    /// Verify an email/password pair and install a fresh credential.
    ///
    /// A missing profile (left behind by an interrupted sign-up) is created
    /// on the way through; failure to do so is logged, not returned.
    ///
    /// # Errors
    ///
    /// `IdentityService` for any provider rejection.
    pub async fn sign_in(
        &self,
        jar: CookieJar,
        email: &str,
        password: &str,
    ) -> Result<(CookieJar, AccountIdentity), SessionError> {
        let session = self.identity.authenticate(email, password).await?;
        let credential = self.issue_credential(&session).await?;
        let jar = session::install(jar, &credential, self.cookies);

        let mut identity = session.identity;
        if let Some(profile) = self.repair_profile(&identity, credential.token()).await {
            identity.display_name = Some(profile.username);
        }
        info!(uid = %identity.uid, "signed in");
        Ok((jar, identity))
    }

    /// Federated (Google) sign-in. On first use, derives a unique username
    /// from the email's local part and creates the profile.
    ///
    /// # Errors
    ///
    /// `IdentityService` for provider rejections (including a cancelled
    /// flow), `ProfileStore` if the profile lookup or write fails.
    pub async fn sign_in_with_google(
        &self,
        jar: CookieJar,
        credential: &FederatedCredential,
    ) -> Result<(CookieJar, AccountIdentity), SessionError> {
        let mut run = Provisioning::new("federated_sign_in");

        let session = self
            .identity
            .authenticate_federated(credential)
            .await
            .map_err(|e| run.fail(ProvisionStep::Authenticate, e))?;
        run.identity_ready(ProvisionStep::Authenticate, &session.identity.uid);

        let issued = self
            .issue_credential(&session)
            .await
            .map_err(|e| run.fail(ProvisionStep::IssueCredential, e))?;
        let jar = session::install(jar, &issued, self.cookies);
        run.done(ProvisionStep::IssueCredential);

        let existing = self
            .profiles
            .get(&session.identity.uid)
            .await
            .map_err(|e| run.fail(ProvisionStep::ReadProfile, e))?;
        run.done(ProvisionStep::ReadProfile);

        let mut identity = session.identity;
        if existing.is_some() {
            info!(uid = %identity.uid, "federated sign-in");
            return Ok((jar, identity));
        }

        let base = base_from_email(identity.email.as_deref());
        let username = self
            .usernames
            .allocate_unique(&base)
            .await
            .map_err(|e| run.fail(ProvisionStep::AllocateUsername, e))?;
        run.done(ProvisionStep::AllocateUsername);

        let profile = UserProfile::new(&identity.uid, username.as_str(), identity.email.clone().unwrap_or_default());
        self.profiles
            .put(&profile)
            .await
            .map_err(|e| run.fail(ProvisionStep::WriteProfile, e))?;
        run.done(ProvisionStep::WriteProfile);

        self.identity
            .update_display_name(issued.token(), username.as_str())
            .await
            .map_err(|e| run.fail(ProvisionStep::SetDisplayName, e))?;

        info!(uid = %identity.uid, username = %username.as_str(), verified = username.is_verified(), "federated account created");
        identity.display_name = Some(username.into_inner());
        Ok((jar, identity))
    }

    /// Sign out at the provider and clear the installed credential.
    ///
    /// Calling this with no active session is a no-op that succeeds.
    ///
    /// # Errors
    ///
    /// `IdentityService` if the provider rejects sign-out of an active session.
    pub async fn logout(&self, jar: CookieJar) -> Result<CookieJar, SessionError> {
        let token = session::token(&jar).map(str::to_owned);
        match self.identity.sign_out(token.as_deref()).await {
            Ok(()) => {}
            Err(e) if token.is_none() => debug!(error = %e, "sign-out without an active session"),
            Err(e) => return Err(e.into()),
        }
        Ok(session::clear(jar, self.cookies))
    }

    /// # Errors
    ///
    /// `ProfileStore` if the query fails.
    pub async fn check_username_availability(&self, candidate: &str) -> Result<bool, SessionError> {
        Ok(self.usernames.is_available(candidate).await?)
    }

    /// Claim `username` for the signed-in identity that has no profile yet.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` without a valid token, `ProfileExists` if the identity
    /// already has a profile, `UsernameTaken` if in use,
    /// `IdentityService`/`ProfileStore` for remote failures.
    pub async fn set_username(&self, token: Option<&str>, username: &str) -> Result<UserProfile, SessionError> {
        let token = token.ok_or(SessionError::NotSignedIn)?;
        let identity = self
            .identity
            .current_identity(token)
            .await?
            .ok_or(SessionError::NotSignedIn)?;

        if self.profiles.get(&identity.uid).await?.is_some() {
            warn!(uid = %identity.uid, %username, "username change refused; profile exists");
            return Err(SessionError::ProfileExists { uid: identity.uid });
        }

        if !self.usernames.is_available(username).await? {
            return Err(SessionError::UsernameTaken { username: username.to_owned() });
        }

        self.identity.update_display_name(token, username).await?;

        let profile = UserProfile::new(&identity.uid, username, identity.email.clone().unwrap_or_default());
        self.profiles.put(&profile).await.map_err(taken_on_conflict)?;
        info!(uid = %identity.uid, %username, "username set");
        Ok(profile)
    }

    /// Ask the provider to send a password-reset email.
    ///
    /// # Errors
    ///
    /// `IdentityService` if the provider rejects the request.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), SessionError> {
        self.identity.send_password_reset(email).await?;
        Ok(())
    }

    /// Resolve the identity behind a bearer token; `None` if the provider
    /// rejects it.
    ///
    /// # Errors
    ///
    /// `IdentityService` if the provider cannot be reached.
    pub async fn current_identity(&self, token: &str) -> Result<Option<AccountIdentity>, SessionError> {
        Ok(self.identity.current_identity(token).await?)
    }

    /// True when the identity has no profile yet.
    ///
    /// # Errors
    ///
    /// `ProfileStore` if the lookup fails.
    pub async fn needs_username(&self, uid: &str) -> Result<bool, SessionError> {
        Ok(self.profiles.get(uid).await?.is_none())
    }

    /// The identity's profile, or one synthesized from the identity itself
    /// when the store has none or cannot be read.
    pub async fn profile_view(&self, identity: &AccountIdentity) -> UserProfile {
        match self.profiles.get(&identity.uid).await {
            Ok(Some(profile)) => UserProfile {
                uid: identity.uid.clone(),
                email: identity.email.clone().unwrap_or(profile.email),
                ..profile
            },
            Ok(None) => {
                error!(uid = %identity.uid, "no profile found; using identity fields");
                fallback_profile(identity)
            }
            Err(e) => {
                error!(uid = %identity.uid, error = %e, "profile lookup failed; using identity fields");
                fallback_profile(identity)
            }
        }
    }

    /// Create the profile an interrupted sign-up failed to write. Returns the
    /// profile when one was created.
    async fn repair_profile(&self, identity: &AccountIdentity, token: &str) -> Option<UserProfile> {
        match self.profiles.get(&identity.uid).await {
            Ok(Some(_)) => return None,
            Ok(None) => {}
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "profile check skipped during sign-in");
                return None;
            }
        }

        match self.create_missing_profile(identity, token).await {
            Ok(profile) => {
                info!(uid = %identity.uid, username = %profile.username, "repaired missing profile");
                Some(profile)
            }
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "profile repair failed; will retry at next sign-in");
                None
            }
        }
    }

    async fn create_missing_profile(&self, identity: &AccountIdentity, token: &str) -> Result<UserProfile, SessionError> {
        let preferred = identity
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty() && !name.chars().any(char::is_whitespace));

        let preferred_free = match preferred {
            Some(name) => self.usernames.is_available(name).await?,
            None => false,
        };

        let username = match preferred {
            Some(name) if preferred_free => AllocatedUsername::Verified(name.to_owned()),
            _ => {
                let allocated = self
                    .usernames
                    .allocate_unique(&base_from_email(identity.email.as_deref()))
                    .await?;
                self.identity
                    .update_display_name(token, allocated.as_str())
                    .await?;
                allocated
            }
        };

        let profile = UserProfile::new(&identity.uid, username.into_inner(), identity.email.clone().unwrap_or_default());
        self.profiles.put(&profile).await.map_err(taken_on_conflict)?;
        Ok(profile)
    }
}

fn fallback_profile(identity: &AccountIdentity) -> UserProfile {
    let username = identity
        .display_name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| {
            identity
                .email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .filter(|local| !local.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "user".to_owned());
    UserProfile::new(&identity.uid, username, identity.email.clone().unwrap_or_default())
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
