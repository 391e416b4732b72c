//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and the edge gate via the
//! `State` extractor. It holds the session coordinator (which owns the
//! identity and profile seams) and the gate settings. Clone is cheap: the
//! coordinator is behind an `Arc`.

use std::sync::Arc;

use crate::gate::GateConfig;
use crate::identity::IdentityProvider;
use crate::profiles::ProfileStore;
use crate::services::coordinator::SessionCoordinator;
use crate::services::session::CookiePolicy;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    pub gate: Arc<GateConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        cookies: CookiePolicy,
        gate: GateConfig,
    ) -> Self {
        Self { coordinator: Arc::new(SessionCoordinator::new(identity, profiles, cookies)), gate: Arc::new(gate) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;
