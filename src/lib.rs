//! Session and identity coordination for a hosted identity service.
//!
//! Combines credential issuance, username allocation, and profile creation
//! behind one coordinator, and gates routes on the resulting session cookie
//! both at the edge and in the client-side view.

pub mod config;
pub mod db;
pub mod gate;
pub mod identity;
pub mod profiles;
pub mod routes;
pub mod services;
pub mod state;
