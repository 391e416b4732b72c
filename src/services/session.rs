//! Session credential and its cookie.
//!
//! ARCHITECTURE
//! ============
//! The credential is the identity provider's bearer token, carried in a
//! cookie named `session` on path `/` for five days. Installing overwrites
//! any previous value; clearing writes an empty value with an expiry in the
//! past. Presence checks treat an empty value as absent, so a cleared jar and
//! an empty jar read the same.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 5;

/// Cookie attributes that vary per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

/// Bearer token proving an authenticated identity, valid for five days from
/// issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
    issued_at: OffsetDateTime,
}

impl SessionCredential {
    #[must_use]
    pub fn issue(token: impl Into<String>) -> Self {
        Self { token: token.into(), issued_at: OffsetDateTime::now_utc() }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.issued_at + Duration::seconds(SESSION_MAX_AGE_SECS)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at()
    }
}

/// Install `credential` as the active session, replacing any prior one.
#[must_use]
pub fn install(jar: CookieJar, credential: &SessionCredential, policy: CookiePolicy) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, credential.token().to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(policy.secure)
        .max_age(Duration::seconds(SESSION_MAX_AGE_SECS));
    jar.add(cookie)
}

/// Replace the session cookie with an already-expired empty one.
#[must_use]
pub fn clear(jar: CookieJar, policy: CookiePolicy) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(policy.secure)
        .expires(OffsetDateTime::UNIX_EPOCH + Duration::seconds(1))
        .max_age(Duration::ZERO);
    jar.add(cookie)
}

/// The installed bearer token, if any.
#[must_use]
pub fn token(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
