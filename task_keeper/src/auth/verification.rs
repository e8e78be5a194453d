//! Email verification codes.
//!
//! One live code per address: issuing again replaces the previous code.
//! Codes expire 300 seconds after issue and are consumed by a successful
//! confirmation. Delivery of the code is left to the caller.

use super::errors::AuthResult;
use crate::db::VerificationRepository;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Lifetime of a verification code in seconds
pub const VERIFICATION_CODE_TTL_SECS: i64 = 300;

const CODE_DIGITS: usize = 6;

/// Pending verification code for an email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Whether the code is still accepted at `now`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::seconds(VERIFICATION_CODE_TTL_SECS)
    }

    /// Constant-time comparison against a presented code
    pub fn matches(&self, code: &str) -> bool {
        self.code.as_bytes().ct_eq(code.as_bytes()).into()
    }
}

fn generate_code() -> String {
    let value: u32 = rand::rng().random_range(0..1_000_000);
    format!("{value:0width$}", width = CODE_DIGITS)
}

/// Issues and confirms verification codes.
#[derive(Clone)]
pub struct VerificationService {
    codes: Arc<dyn VerificationRepository>,
}

impl VerificationService {
    pub fn new(codes: Arc<dyn VerificationRepository>) -> Self {
        Self { codes }
    }

    /// Create a fresh code for `email`, replacing any previous one.
    ///
    /// Returns the code so it can be handed to a mailer.
    pub async fn issue(&self, email: &str) -> AuthResult<String> {
        let record = VerificationRecord {
            email: email.to_string(),
            code: generate_code(),
            created_at: Utc::now(),
        };
        self.codes.upsert_code(&record).await?;

        log::debug!("Issued verification code for {email}");
        Ok(record.code)
    }

    /// Check `code` against the live code for `email`.
    ///
    /// A match consumes the record, so a code confirms at most once.
    pub async fn confirm(&self, email: &str, code: &str) -> AuthResult<bool> {
        let confirmed = self.codes.take_code(email, code).await?;
        if confirmed {
            log::info!("Verification code confirmed for {email}");
        }
        Ok(confirmed)
    }

    /// Remove expired records; returns how many were deleted
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let purged = self.codes.purge_expired().await?;
        if purged > 0 {
            log::debug!("Purged {purged} expired verification codes");
        }
        Ok(purged)
    }
}
