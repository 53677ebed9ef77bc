//! Bearer tokens for the public view and sign links.
//!
//! Raw tokens are random bytes encoded URL-safe and handed out once. Only
//! their SHA-256 hex digest is stored; lookups hash the presented value.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use receipta_shared::LedgerConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LedgerError;

/// Smallest accepted token length in bytes.
pub const MIN_TOKEN_BYTES: usize = 32;
/// Largest accepted token length in bytes.
pub const MAX_TOKEN_BYTES: usize = 64;
/// Token length used when nothing is configured.
pub const DEFAULT_TOKEN_BYTES: usize = 48;
/// Link lifetime used when nothing is configured.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
/// Longest configurable link lifetime.
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// What a link grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    /// Read-only access to the invoice.
    View,
    /// Permission to sign once.
    Sign,
}

impl LinkType {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::View => "VIEW",
            Self::Sign => "SIGN",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validity fields of a stored link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Set once revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Token settings passed to the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Lifetime of links minted on send.
    pub token_ttl: Duration,
    /// Random bytes per token.
    pub token_bytes: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            token_ttl: Duration::days(DEFAULT_TOKEN_TTL_DAYS),
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

impl TryFrom<&LedgerConfig> for LedgerSettings {
    type Error = LedgerError;

    fn try_from(config: &LedgerConfig) -> Result<Self, Self::Error> {
        ensure_token_bytes(config.token_bytes)?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&config.public_token_ttl_days) {
            return Err(LedgerError::validation(format!(
                "ledger.public_token_ttl_days must be between 1 and {MAX_TOKEN_TTL_DAYS}"
            )));
        }
        let token_ttl = Duration::try_days(config.public_token_ttl_days).ok_or_else(|| {
            LedgerError::validation("ledger.public_token_ttl_days is out of range")
        })?;

        Ok(Self {
            token_ttl,
            token_bytes: config.token_bytes,
        })
    }
}

impl LedgerSettings {
    /// Expiry for links minted at `now`.
    pub fn link_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, LedgerError> {
        now.checked_add_signed(self.token_ttl)
            .ok_or_else(|| LedgerError::validation("token lifetime is out of range"))
    }
}

/// Generates a URL-safe token from `bytes` random bytes.
pub fn generate_token(bytes: usize) -> Result<String, LedgerError> {
    ensure_token_bytes(bytes)?;
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    Ok(base64_url::encode(&buf))
}

/// SHA-256 hex digest of a raw token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hash_bytes(token.as_bytes())
}

/// SHA-256 hex digest of arbitrary bytes.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Checks a stored link at `now`.
///
/// Revoked links are reported exactly like unknown tokens, as
/// `NotFound("Invoice")`; a link whose expiry is at or before `now` is
/// `TokenExpired`.
pub fn check_link(link: &LinkState, now: DateTime<Utc>) -> Result<(), LedgerError> {
    if link.revoked_at.is_some() {
        return Err(LedgerError::NotFound("Invoice"));
    }
    if link.expires_at <= now {
        return Err(LedgerError::TokenExpired);
    }
    Ok(())
}

fn ensure_token_bytes(bytes: usize) -> Result<(), LedgerError> {
    if (MIN_TOKEN_BYTES..=MAX_TOKEN_BYTES).contains(&bytes) {
        Ok(())
    } else {
        Err(LedgerError::validation(format!(
            "token length must be between {MIN_TOKEN_BYTES} and {MAX_TOKEN_BYTES} bytes"
        )))
    }
}
