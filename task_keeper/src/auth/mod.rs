//! Authentication core: password hashing, session tokens and verification codes.
//!
//! - Argon2id password digests, hashed off the async scheduler
//! - HS256 access tokens (15 minutes) and refresh tokens (2 hours, or 7 days
//!   with "remember me"), each kind signed with its own secret
//! - Stateless validation: a token is valid when its signature and time
//!   claims check out, no storage lookup involved
//! - Short-lived email verification codes
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use task_keeper::auth::{AuthManager, LoginRequest, TokenIssuer, TokenKeys};
//! use task_keeper::db::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let keys = TokenKeys::new("access-secret", "refresh-secret")?;
//!     let auth = AuthManager::new(Arc::new(MemoryStore::new()), TokenIssuer::new(keys));
//!
//!     let (user, tokens) = auth
//!         .login(LoginRequest {
//!             email_or_username: "alice".to_string(),
//!             password: "Secret123".to_string(),
//!             remember_me: true,
//!         })
//!         .await?;
//!     println!("{} logged in, refresh expires {}", user.username, tokens.refresh.expires_at);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod tokens;
pub mod verification;

pub use errors::{AuthError, AuthResult, TokenError};
pub use manager::AuthManager;
pub use models::{
    IssuedToken, LoginRequest, NewUser, RegisterRequest, SessionTokens, TokenClaims, TokenKind,
    User, UserId,
};
pub use password::PasswordHasher;
pub use tokens::{
    ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS, REMEMBER_ME_REFRESH_TTL_SECS, TokenIssuer,
    TokenKeys,
};
pub use verification::{VERIFICATION_CODE_TTL_SECS, VerificationRecord, VerificationService};
