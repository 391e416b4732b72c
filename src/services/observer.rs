//! Auth observation state: a subscribable mirror of "who is signed in".
//!
//! Starts as `Loading`, becomes `Authenticated` or `Unauthenticated` once the
//! identity provider has answered, and is republished on every change.
//! Consumers hold a `watch::Receiver` instead of polling a global.

use serde::Serialize;
use tokio::sync::watch;

use crate::identity::AccountIdentity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum AuthState {
    Loading,
    Authenticated(AccountIdentity),
    Unauthenticated,
}

impl AuthState {
    #[must_use]
    pub fn from_identity(identity: Option<AccountIdentity>) -> Self {
        identity.map_or(Self::Unauthenticated, Self::Authenticated)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn identity(&self) -> Option<&AccountIdentity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Loading | Self::Unauthenticated => None,
        }
    }
}

#[derive(Debug)]
pub struct AuthObserver {
    tx: watch::Sender<AuthState>,
}

impl AuthObserver {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::Loading);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Publish the provider's answer. Subscribers are only woken when the
    /// state actually changes.
    pub fn publish(&self, identity: Option<AccountIdentity>) {
        let next = AuthState::from_identity(identity);
        self.tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

impl Default for AuthObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "observer_test.rs"]
mod tests;
