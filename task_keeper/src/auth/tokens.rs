//! Access and refresh token issuance and validation.
//!
//! Both token kinds are HS256 JWTs carrying only the user id and time claims.
//! They are signed with distinct secrets, so an access token never validates
//! as a refresh token and vice versa. Validation is a pure signature and
//! expiry check with no storage lookup.

use super::errors::{AuthError, AuthResult, TokenError};
use super::models::{IssuedToken, SessionTokens, TokenClaims, TokenKind, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use std::fmt;

/// Access token lifetime (15 minutes)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Default refresh token lifetime (2 hours)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;
/// Refresh token lifetime with "remember me" (7 days)
pub const REMEMBER_ME_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signing material for both token kinds, fixed at startup
pub struct TokenKeys {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenKeys {
    /// Build keys from the two secrets.
    ///
    /// Both must be non-empty and they must differ.
    pub fn new(access_secret: &str, refresh_secret: &str) -> AuthResult<Self> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(AuthError::KeyConfiguration(
                "token secrets must not be empty".to_string(),
            ));
        }
        if access_secret == refresh_secret {
            return Err(AuthError::KeyConfiguration(
                "access and refresh secrets must differ".to_string(),
            ));
        }

        Ok(Self {
            access: KeyPair::from_secret(access_secret.as_bytes()),
            refresh: KeyPair::from_secret(refresh_secret.as_bytes()),
        })
    }

    fn pair(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenKeys([REDACTED])")
    }
}

/// Mints and checks session tokens.
#[derive(Debug)]
pub struct TokenIssuer {
    keys: TokenKeys,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(keys: TokenKeys) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        Self { keys, validation }
    }

    /// Sign an access token valid for 15 minutes from now
    pub fn issue_access(&self, user_id: UserId) -> AuthResult<IssuedToken> {
        self.issue_access_at(user_id, Utc::now())
    }

    /// Sign a refresh token; 7 days if `remember`, otherwise 2 hours
    pub fn issue_refresh(&self, user_id: UserId, remember: bool) -> AuthResult<IssuedToken> {
        self.issue_refresh_at(user_id, remember, Utc::now())
    }

    /// Sign both tokens for a fresh login
    pub fn issue_session(&self, user_id: UserId, remember: bool) -> AuthResult<SessionTokens> {
        let now = Utc::now();
        Ok(SessionTokens {
            access: self.issue_access_at(user_id, now)?,
            refresh: self.issue_refresh_at(user_id, remember, now)?,
        })
    }

    pub fn issue_access_at(&self, user_id: UserId, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        self.sign(
            TokenKind::Access,
            user_id,
            now,
            Duration::seconds(ACCESS_TOKEN_TTL_SECS),
        )
    }

    pub fn issue_refresh_at(
        &self,
        user_id: UserId,
        remember: bool,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let ttl = if remember {
            REMEMBER_ME_REFRESH_TTL_SECS
        } else {
            REFRESH_TOKEN_TTL_SECS
        };
        self.sign(TokenKind::Refresh, user_id, now, Duration::seconds(ttl))
    }

    fn sign(
        &self,
        kind: TokenKind,
        user_id: UserId,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> AuthResult<IssuedToken> {
        let expires_at = now + lifetime;
        let claims = TokenClaims {
            user_id,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys.pair(kind).encoding,
        )
        .map_err(AuthError::Signing)?;

        Ok(IssuedToken {
            kind,
            token,
            lifetime,
            expires_at,
        })
    }

    /// Validate an access token and return its claims
    pub fn verify_access(&self, token: &str) -> AuthResult<TokenClaims> {
        self.verify(TokenKind::Access, token)
    }

    /// Validate a refresh token and return its claims
    pub fn verify_refresh(&self, token: &str) -> AuthResult<TokenClaims> {
        self.verify(TokenKind::Refresh, token)
    }

    /// Validate a token of the given kind against the current time.
    ///
    /// # Errors
    ///
    /// `AuthError::Token` tagged with `kind` and one of `Expired`,
    /// `NotYetValid` or `Invalid`.
    pub fn verify(&self, kind: TokenKind, token: &str) -> AuthResult<TokenClaims> {
        decode::<TokenClaims>(token, &self.keys.pair(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let error = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                    _ => TokenError::Invalid,
                };
                AuthError::token(kind, error)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "access-secret-for-tests-0123456789";
    const REFRESH_SECRET: &str = "refresh-secret-for-tests-0123456789";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenKeys::new(ACCESS_SECRET, REFRESH_SECRET).unwrap())
    }

    fn token_error(result: AuthResult<TokenClaims>) -> (TokenKind, TokenError) {
        match result {
            Err(AuthError::Token { kind, error }) => (kind, error),
            other => panic!("expected token error, got {other:?}"),
        }
    }

    #[test]
    fn test_keys_reject_empty_secret() {
        assert!(matches!(
            TokenKeys::new("", REFRESH_SECRET),
            Err(AuthError::KeyConfiguration(_))
        ));
        assert!(matches!(
            TokenKeys::new(ACCESS_SECRET, ""),
            Err(AuthError::KeyConfiguration(_))
        ));
    }

    #[test]
    fn test_keys_reject_shared_secret() {
        assert!(matches!(
            TokenKeys::new(ACCESS_SECRET, ACCESS_SECRET),
            Err(AuthError::KeyConfiguration(_))
        ));
    }

    #[test]
    fn test_access_roundtrip() {
        let issuer = issuer();
        let token = issuer.issue_access(42).unwrap();
        assert_eq!(token.kind, TokenKind::Access);
        assert_eq!(token.max_age_secs(), 900);

        let claims = issuer.verify_access(&token.token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_access_valid_just_before_expiry() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::seconds(14 * 60 + 59);
        let token = issuer.issue_access_at(7, issued_at).unwrap();
        assert_eq!(issuer.verify_access(&token.token).unwrap().user_id, 7);
    }

    #[test]
    fn test_access_expired_just_after_expiry() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::seconds(15 * 60 + 1);
        let token = issuer.issue_access_at(7, issued_at).unwrap();
        assert_eq!(
            token_error(issuer.verify_access(&token.token)),
            (TokenKind::Access, TokenError::Expired)
        );
    }

    #[test]
    fn test_refresh_lifetimes() {
        let issuer = issuer();
        let now = Utc::now();

        let remembered = issuer.issue_refresh_at(1, true, now).unwrap();
        let claims = issuer.verify_refresh(&remembered.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
        assert_eq!(remembered.max_age_secs(), 604_800);

        let short = issuer.issue_refresh_at(1, false, now).unwrap();
        let claims = issuer.verify_refresh(&short.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 2 * 60 * 60);
        assert_eq!(short.max_age_secs(), 7_200);
    }

    #[test]
    fn test_refresh_expired() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::seconds(REFRESH_TOKEN_TTL_SECS + 5);
        let token = issuer.issue_refresh_at(3, false, issued_at).unwrap();
        let err = issuer.verify_refresh(&token.token).unwrap_err();
        assert_eq!(err.to_string(), "Refresh token has expired");
    }

    #[test]
    fn test_cross_kind_tokens_rejected() {
        let issuer = issuer();
        let access = issuer.issue_access(5).unwrap();
        let refresh = issuer.issue_refresh(5, false).unwrap();

        assert_eq!(
            token_error(issuer.verify_refresh(&access.token)),
            (TokenKind::Refresh, TokenError::Invalid)
        );
        assert_eq!(
            token_error(issuer.verify_access(&refresh.token)),
            (TokenKind::Access, TokenError::Invalid)
        );
    }

    #[test]
    fn test_foreign_key_rejected() {
        let other = TokenIssuer::new(
            TokenKeys::new("another-access-secret-0123456789", REFRESH_SECRET).unwrap(),
        );
        let forged = other.issue_access(1).unwrap();
        assert_eq!(
            token_error(issuer().verify_access(&forged.token)),
            (TokenKind::Access, TokenError::Invalid)
        );
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue_access(9).unwrap().token;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = "eyJ1c2VyX2lkIjoxLCJpYXQiOjAsIm5iZiI6MCwiZXhwIjo5OTk5OTk5OTk5fQ";
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert_eq!(
            token_error(issuer.verify_access(&tampered)),
            (TokenKind::Access, TokenError::Invalid)
        );
        assert_eq!(
            token_error(issuer.verify_access("not.a.jwt")),
            (TokenKind::Access, TokenError::Invalid)
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let issuer = issuer();
        let token = issuer
            .issue_access_at(2, Utc::now() + Duration::seconds(120))
            .unwrap();
        assert_eq!(
            token_error(issuer.verify_access(&token.token)),
            (TokenKind::Access, TokenError::NotYetValid)
        );
    }

    #[test]
    fn test_session_pair() {
        let issuer = issuer();
        let session = issuer.issue_session(11, true).unwrap();
        assert_eq!(session.access.kind, TokenKind::Access);
        assert_eq!(session.refresh.kind, TokenKind::Refresh);
        assert_eq!(session.refresh.max_age_secs(), REMEMBER_ME_REFRESH_TTL_SECS);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let keys = TokenKeys::new(ACCESS_SECRET, REFRESH_SECRET).unwrap();
        assert!(!format!("{keys:?}").contains("access-secret"));
    }
}
