//! Username allocation: uniqueness checks and collision-free derivation.
//!
//! DESIGN
//! ======
//! A candidate is available when no profile carries it. `allocate_unique`
//! tries the base, then `base1` through `base999`, then gives up on probing
//! and appends a random six-character suffix without a final check. The
//! result records which path produced it so callers (and tests) can tell a
//! verified name from the unverified fallback.
//!
//! TRADE-OFFS
//! ==========
//! Probing is sequential and unlocked: two allocations racing for the same
//! base can both see it free. The profile store's unique index is the final
//! arbiter and reports the loser as a username conflict.

use std::sync::Arc;

use rand::Rng;

use crate::profiles::{ProfileStore, ProfileStoreError};

pub const MAX_NUMERIC_SUFFIX: u32 = 999;
pub const RANDOM_SUFFIX_LEN: usize = 6;
const RANDOM_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A username produced by [`UsernameAllocator::allocate_unique`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocatedUsername {
    /// Confirmed free at the time of the check.
    Verified(String),
    /// Random-suffix fallback, never checked against the store.
    Unverified(String),
}

impl AllocatedUsername {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Verified(name) | Self::Unverified(name) => name,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        match self {
            Self::Verified(name) | Self::Unverified(name) => name,
        }
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// Derive a base username from an email's local part: ASCII letters and
/// digits only, lowercased. May be empty.
#[must_use]
pub fn base_from_email(email: Option<&str>) -> String {
    email
        .and_then(|e| e.split('@').next())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[must_use]
pub fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..RANDOM_SUFFIX_ALPHABET.len());
            char::from(RANDOM_SUFFIX_ALPHABET[idx])
        })
        .collect()
}

#[derive(Clone)]
pub struct UsernameAllocator {
    store: Arc<dyn ProfileStore>,
}

impl UsernameAllocator {
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// True iff no profile has `username == candidate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile store query fails.
    pub async fn is_available(&self, candidate: &str) -> Result<bool, ProfileStoreError> {
        Ok(self.store.find_by_username(candidate).await?.is_empty())
    }

    /// Return `base` if free, else the first free `base{n}` for n in 1..=999,
    /// else `base` plus a random suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if any availability query fails.
    pub async fn allocate_unique(&self, base: &str) -> Result<AllocatedUsername, ProfileStoreError> {
        if self.is_available(base).await? {
            return Ok(AllocatedUsername::Verified(base.to_owned()));
        }

        for counter in 1..=MAX_NUMERIC_SUFFIX {
            let candidate = format!("{base}{counter}");
            if self.is_available(&candidate).await? {
                return Ok(AllocatedUsername::Verified(candidate));
            }
        }

        let fallback = format!("{base}{}", random_suffix());
        tracing::warn!(%base, username = %fallback, "numeric suffixes exhausted; using unverified random suffix");
        Ok(AllocatedUsername::Unverified(fallback))
    }
}

#[cfg(test)]
#[path = "username_test.rs"]
mod tests;
