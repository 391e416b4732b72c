//! Route authorization gate.
//!
//! DESIGN
//! ======
//! One decision table, evaluated at two layers:
//!
//! | route class  | session | action                     |
//! |--------------|---------|----------------------------|
//! | protected    | absent  | redirect to public entry   |
//! | public-only  | present | redirect to protected home |
//! | anything else|         | allow                      |
//!
//! The edge layer (`edge_gate`, an axum middleware) decides from the
//! presence of the `session` cookie alone. The client layer (`view_decision`)
//! decides from the observed auth state and renders nothing while that state
//! is still loading.
//!
//! TRADE-OFFS
//! ==========
//! Cookie presence is not proof of a valid token. With `verify_tokens` set,
//! the edge asks the identity provider to resolve the token and treats a
//! rejected or unverifiable one as absent, at the cost of one provider call
//! per gated request.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::services::observer::AuthState;
use crate::services::session;
use crate::state::AppState;

pub const DEFAULT_PUBLIC_ENTRY: &str = "/sign-up";
pub const DEFAULT_PROTECTED_HOME: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    PublicOnly,
    Protected,
    Unrestricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPresence {
    Present,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

/// Client-side outcome; `Pending` means render nothing yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewDecision {
    Pending,
    Allow,
    Redirect(String),
}

// =============================================================================
// ROUTES + DECISION TABLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRoutes {
    public_entry: String,
    protected_home: String,
}

impl Default for GateRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_ENTRY, DEFAULT_PROTECTED_HOME)
    }
}

impl GateRoutes {
    #[must_use]
    pub fn new(public_entry: impl Into<String>, protected_home: impl Into<String>) -> Self {
        Self { public_entry: public_entry.into(), protected_home: protected_home.into() }
    }

    #[must_use]
    pub fn public_entry(&self) -> &str {
        &self.public_entry
    }

    #[must_use]
    pub fn protected_home(&self) -> &str {
        &self.protected_home
    }

    /// Protected: the home route and anything beneath it. Public-only: the
    /// entry route exactly.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        let under_home = path
            .strip_prefix(self.protected_home.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if under_home {
            RouteClass::Protected
        } else if path == self.public_entry {
            RouteClass::PublicOnly
        } else {
            RouteClass::Unrestricted
        }
    }

    #[must_use]
    pub fn decide(&self, class: RouteClass, presence: SessionPresence) -> GateDecision {
        match (class, presence) {
            (RouteClass::Protected, SessionPresence::Absent) => GateDecision::Redirect(self.public_entry.clone()),
            (RouteClass::PublicOnly, SessionPresence::Present) => GateDecision::Redirect(self.protected_home.clone()),
            _ => GateDecision::Allow,
        }
    }

    #[must_use]
    pub fn evaluate(&self, path: &str, presence: SessionPresence) -> GateDecision {
        self.decide(self.classify(path), presence)
    }

    /// Client-side gate over the observed auth state.
    #[must_use]
    pub fn view_decision(&self, path: &str, state: &AuthState) -> ViewDecision {
        let presence = match state {
            AuthState::Loading => return ViewDecision::Pending,
            AuthState::Authenticated(_) => SessionPresence::Present,
            AuthState::Unauthenticated => SessionPresence::Absent,
        };
        match self.evaluate(path, presence) {
            GateDecision::Allow => ViewDecision::Allow,
            GateDecision::Redirect(to) => ViewDecision::Redirect(to),
        }
    }
}

/// Edge-layer gate settings.
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    pub routes: GateRoutes,
    /// Resolve the cookie's token with the identity provider instead of
    /// trusting presence.
    pub verify_tokens: bool,
}

// =============================================================================
// EDGE MIDDLEWARE
// =============================================================================

async fn session_presence(state: &AppState, jar: &CookieJar) -> SessionPresence {
    let Some(token) = session::token(jar) else {
        return SessionPresence::Absent;
    };
    if !state.gate.verify_tokens {
        return SessionPresence::Present;
    }
    match state.coordinator.current_identity(token).await {
        Ok(Some(_)) => SessionPresence::Present,
        Ok(None) => SessionPresence::Absent,
        Err(e) => {
            tracing::warn!(error = %e, "session token could not be verified; treating as absent");
            SessionPresence::Absent
        }
    }
}

/// Redirect requests whose route class and session presence disagree;
/// pass everything else through unchanged.
pub async fn edge_gate(State(state): State<AppState>, jar: CookieJar, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let class = state.gate.routes.classify(&path);
    if class == RouteClass::Unrestricted {
        return next.run(request).await;
    }

    let presence = session_presence(&state, &jar).await;
    match state.gate.routes.decide(class, presence) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(to) => {
            tracing::debug!(%path, %to, ?presence, "gate redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
