//! Client session: one agent's local view of its own authentication.
//!
//! DESIGN
//! ======
//! A `ClientSession` owns the agent's cookie jar (the credential slot), an
//! [`AuthObserver`], and a `needs_username` flag. Every coordinator call that
//! changes who is signed in goes through here, so the observed state is
//! republished from the same place the credential is written. `resolve`
//! answers the initial `Loading` state from whatever credential the jar
//! already carries.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;
use tokio::sync::watch;
use tracing::warn;

use super::coordinator::{SessionCoordinator, SessionError};
use super::observer::{AuthObserver, AuthState};
use super::session;
use crate::gate::{GateRoutes, ViewDecision};
use crate::identity::{AccountIdentity, FederatedCredential};
use crate::profiles::UserProfile;

pub struct ClientSession {
    coordinator: Arc<SessionCoordinator>,
    jar: CookieJar,
    observer: AuthObserver,
    needs_username: watch::Sender<bool>,
}

impl ClientSession {
    #[must_use]
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self::with_jar(coordinator, CookieJar::new())
    }

    /// Start from a jar that may already hold a credential.
    #[must_use]
    pub fn with_jar(coordinator: Arc<SessionCoordinator>, jar: CookieJar) -> Self {
        let (needs_username, _rx) = watch::channel(false);
        Self { coordinator, jar, observer: AuthObserver::new(), needs_username }
    }

    #[must_use]
    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        session::token(&self.jar)
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.observer.current()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.observer.subscribe()
    }

    #[must_use]
    pub fn needs_username(&self) -> bool {
        *self.needs_username.borrow()
    }

    #[must_use]
    pub fn subscribe_needs_username(&self) -> watch::Receiver<bool> {
        self.needs_username.subscribe()
    }

    /// Client-side gate decision for `path` under the current state.
    #[must_use]
    pub fn view(&self, path: &str, routes: &GateRoutes) -> ViewDecision {
        routes.view_decision(path, &self.observer.current())
    }

    /// Ask the identity provider who the installed credential belongs to and
    /// publish the answer.
    ///
    /// # Errors
    ///
    /// `IdentityService` if the provider cannot be reached; the observed
    /// state is left unchanged.
    pub async fn resolve(&self) -> Result<AuthState, SessionError> {
        let identity = match self.token() {
            Some(token) => self.coordinator.current_identity(token).await?,
            None => None,
        };
        self.settle(identity).await;
        Ok(self.state())
    }

    /// # Errors
    ///
    /// See [`SessionCoordinator::sign_up`].
    pub async fn sign_up(&mut self, email: &str, username: &str, password: &str) -> Result<AccountIdentity, SessionError> {
        let (jar, identity) = self
            .coordinator
            .sign_up(self.jar.clone(), email, username, password)
            .await?;
        self.jar = jar;
        self.settle(Some(identity.clone())).await;
        Ok(identity)
    }

    /// # Errors
    ///
    /// See [`SessionCoordinator::sign_in`].
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<AccountIdentity, SessionError> {
        let (jar, identity) = self
            .coordinator
            .sign_in(self.jar.clone(), email, password)
            .await?;
        self.jar = jar;
        self.settle(Some(identity.clone())).await;
        Ok(identity)
    }

    /// # Errors
    ///
    /// See [`SessionCoordinator::sign_in_with_google`].
    pub async fn sign_in_with_google(&mut self, credential: &FederatedCredential) -> Result<AccountIdentity, SessionError> {
        let (jar, identity) = self
            .coordinator
            .sign_in_with_google(self.jar.clone(), credential)
            .await?;
        self.jar = jar;
        self.settle(Some(identity.clone())).await;
        Ok(identity)
    }

    /// # Errors
    ///
    /// See [`SessionCoordinator::logout`]; on error the credential stays.
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        self.jar = self.coordinator.logout(self.jar.clone()).await?;
        self.settle(None).await;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`SessionCoordinator::set_username`].
    pub async fn set_username(&mut self, username: &str) -> Result<UserProfile, SessionError> {
        let profile = self.coordinator.set_username(self.token(), username).await?;
        if let AuthState::Authenticated(identity) = self.observer.current() {
            let renamed = AccountIdentity { display_name: Some(profile.username.clone()), ..identity };
            self.observer.publish(Some(renamed));
        }
        self.needs_username.send_replace(false);
        Ok(profile)
    }

    async fn settle(&self, identity: Option<AccountIdentity>) {
        let needs = match &identity {
            Some(identity) => match self.coordinator.needs_username(&identity.uid).await {
                Ok(needs) => needs,
                Err(e) => {
                    warn!(uid = %identity.uid, error = %e, "could not check for profile");
                    false
                }
            },
            None => false,
        };
        self.observer.publish(identity);
        self.needs_username.send_if_modified(|current| {
            let changed = *current != needs;
            *current = needs;
            changed
        });
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
