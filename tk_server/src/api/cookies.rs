//! Signed-cookie transport for session tokens.
//!
//! Tokens travel in two cookies, `accessToken` and `refreshToken`. Each is
//! HMAC-signed by the cookie jar on top of the JWT's own signature, so an
//! edited cookie is rejected before the token is even decoded.

use axum::http::HeaderMap;
use axum_extra::extract::{
    CookieJar, SignedCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use cookie::time::Duration;
use sha2::{Digest, Sha512};
use std::fmt;
use task_keeper::auth::{AuthError, IssuedToken, SessionTokens, TokenError, TokenKind};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Cookie name carrying the given token kind
pub fn cookie_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Access => ACCESS_COOKIE,
        TokenKind::Refresh => REFRESH_COOKIE,
    }
}

/// Builds, reads and clears the session cookies
#[derive(Clone)]
pub struct CookieTransport {
    key: Key,
    secure: bool,
}

impl fmt::Debug for CookieTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieTransport")
            .field("key", &"[REDACTED]")
            .field("secure", &self.secure)
            .finish()
    }
}

impl CookieTransport {
    /// Derive the 64-byte signing key from `secret` with SHA-512
    pub fn new(secret: &str, secure: bool) -> Self {
        let digest = Sha512::digest(secret.as_bytes());
        Self {
            key: Key::from(digest.as_slice()),
            secure,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Signed view over the cookies of a request
    pub fn jar(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.key.clone())
    }

    /// Read the token of `kind` from the request cookies.
    ///
    /// # Errors
    ///
    /// * `TokenError::Missing` - cookie absent or empty
    /// * `TokenError::Invalid` - cookie present but its signature does not verify
    pub fn read_token(&self, headers: &HeaderMap, kind: TokenKind) -> Result<String, AuthError> {
        let name = cookie_name(kind);
        if let Some(cookie) = self.jar(headers).get(name) {
            if cookie.value().is_empty() {
                return Err(AuthError::token(kind, TokenError::Missing));
            }
            return Ok(cookie.value().to_string());
        }

        // The signed jar drops cookies that fail verification
        let error = match CookieJar::from_headers(headers).get(name) {
            Some(raw) if !raw.value().is_empty() => TokenError::Invalid,
            _ => TokenError::Missing,
        };
        Err(AuthError::token(kind, error))
    }

    /// Cookie carrying `token`, `Max-Age` matching the token lifetime
    pub fn token_cookie(&self, token: &IssuedToken) -> Cookie<'static> {
        Cookie::build((cookie_name(token.kind), token.token.clone()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .path("/")
            .max_age(Duration::seconds(token.max_age_secs()))
            .build()
    }

    /// Add both session cookies
    pub fn set_session(&self, jar: SignedCookieJar, tokens: &SessionTokens) -> SignedCookieJar {
        jar.add(self.token_cookie(&tokens.access))
            .add(self.token_cookie(&tokens.refresh))
    }

    /// Replace the access cookie
    pub fn set_access(&self, jar: SignedCookieJar, access: &IssuedToken) -> SignedCookieJar {
        jar.add(self.token_cookie(access))
    }

    /// Emit expired replacements for both cookies.
    ///
    /// Removal cookies are added explicitly so they are sent even when the
    /// request carried no session.
    pub fn clear(&self, jar: SignedCookieJar) -> SignedCookieJar {
        [ACCESS_COOKIE, REFRESH_COOKIE]
            .into_iter()
            .fold(jar, |jar, name| jar.add(self.removal_cookie(name)))
    }

    fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = Cookie::build((name, ""))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .path("/")
            .build();
        cookie.make_removal();
        cookie
    }
}
