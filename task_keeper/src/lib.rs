//! # Task Keeper
//!
//! Authentication core and persistence services for a personal task tracker.
//!
//! ## Core Modules
//!
//! - [`auth`]: Password hashing, access/refresh tokens, verification codes
//! - [`db`]: Repository traits with PostgreSQL and in-memory stores
//! - [`tasks`]: Per-user task operations
//! - [`users`]: Profile reads, updates and account deletion
//!
//! ## Example
//!
//! ```
//! use task_keeper::auth::{TokenIssuer, TokenKeys};
//!
//! let keys = TokenKeys::new("access-secret", "refresh-secret").unwrap();
//! let issuer = TokenIssuer::new(keys);
//! let token = issuer.issue_access(1).unwrap();
//! assert_eq!(issuer.verify_access(&token.token).unwrap().user_id, 1);
//! ```

/// Authentication core.
pub mod auth;

/// Persistence collaborators.
pub mod db;

/// Task tracking.
pub mod tasks;

/// User profiles.
pub mod users;

pub use auth::{AuthError, AuthManager, TokenIssuer, TokenKeys, VerificationService};
pub use db::{MemoryStore, PgStore, StoreError};
pub use tasks::{TaskError, TaskManager};
pub use users::{UserError, UserManager};
