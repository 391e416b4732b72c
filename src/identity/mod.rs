//! Identity: the hosted identity service seam.
//!
//! DESIGN
//! ======
//! The session layer talks to the identity service only through the
//! [`IdentityProvider`] trait. `FirebaseIdentity` is the production adapter
//! over the identity toolkit REST API; tests substitute an in-memory fake.

pub mod config;
pub mod firebase;
pub mod types;

pub use firebase::FirebaseIdentity;
pub use types::{
    AccountIdentity, FederatedCredential, IdentityError, IdentityErrorKind, IdentityProvider, ProviderSession,
};
