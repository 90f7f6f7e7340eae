//! Token generation, decoding, use tracking and comparison.

use crate::constants::{DEFAULT_TOKEN_LENGTH, DEFAULT_TOKEN_LIFETIME, START_USES};
use crate::error::{Result, TokenError};
use crate::token::{CsrfToken, MAX_WIRE_YEAR, WIRE_ENGINE};
use base64::Engine;
use chrono::{DateTime, Datelike, SubsecRound, TimeDelta, Utc};
use rand::RngCore;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, trace};

/// Issues and interprets CSRF wire tokens.
///
/// Holds no per-request state; a single codec can be shared by every request
/// handler.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    token_length: usize,
    lifetime: Duration,
}

impl TokenCodec {
    /// Create a codec whose tokens carry `token_length` random bytes.
    pub fn new(token_length: usize) -> Self {
        Self {
            token_length,
            lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Set the token lifetime
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Random bytes in each token identifier
    pub fn token_length(&self) -> usize {
        self.token_length
    }

    /// Time from issue to expiry
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Generate a new encoded token with a use count of zero
    pub fn generate(&self) -> Result<String> {
        self.generate_at(Utc::now())
    }

    /// Generate a new encoded token issued at `now`
    pub fn generate_at(&self, now: DateTime<Utc>) -> Result<String> {
        self.issue_at(now)?.encode()
    }

    /// Build a fresh token value issued at `now`.
    ///
    /// Timestamps are truncated to milliseconds, the precision of the wire
    /// format, so a token survives an encode/decode cycle unchanged.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidToken`] when the lifetime puts the expiry past
    /// the last year a wire timestamp can carry.
    pub fn issue_at(&self, now: DateTime<Utc>) -> Result<CsrfToken> {
        let issued_at = now.trunc_subsecs(3);
        let expires_at = TimeDelta::from_std(self.lifetime)
            .ok()
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .filter(|expires_at| expires_at.year() <= MAX_WIRE_YEAR)
            .ok_or_else(|| {
                TokenError::invalid(format!(
                    "Token lifetime of {}s puts expiry out of range",
                    self.lifetime.as_secs()
                ))
            })?;

        trace!(token_length = self.token_length, expires_at = %expires_at, "Issuing CSRF token");

        Ok(CsrfToken::fresh(self.random_id(), issued_at, expires_at, START_USES))
    }

    /// Decode an encoded token
    pub fn decode(&self, token: &str) -> Result<CsrfToken> {
        CsrfToken::decode(token)
    }

    /// Record one use of an encoded token and return its new encoding.
    ///
    /// The returned string replaces `token` as the token of record.
    ///
    /// # Errors
    ///
    /// Decode failures, and [`TokenError::MaxUsesExceeded`](crate::TokenError::MaxUsesExceeded)
    /// when the token has already been used [`MAX_USES`](crate::MAX_USES) times.
    pub fn use_token(&self, token: &str) -> Result<String> {
        let mut csrf = self.decode(token)?;
        csrf.record_use()?;
        debug!(uses = csrf.use_count(), remaining = csrf.remaining_uses(), "CSRF token used");
        csrf.encode()
    }

    /// Compare the cookie and header copies of a token.
    ///
    /// Empty inputs and inputs of different length are rejected up front;
    /// equal-length inputs are compared in constant time. The token is not
    /// decoded, so expiry and use count are not considered here.
    pub fn validate(&self, cookie_token: &str, header_token: &str) -> bool {
        if cookie_token.is_empty() || header_token.is_empty() {
            return false;
        }

        if cookie_token.len() != header_token.len() {
            return false;
        }

        constant_time_eq(cookie_token.as_bytes(), header_token.as_bytes())
    }

    fn random_id(&self) -> String {
        let mut bytes = vec![0u8; self.token_length];
        rand::thread_rng().fill_bytes(&mut bytes);
        WIRE_ENGINE.encode(bytes)
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}

/// Constant-time byte comparison (prevent timing attacks)
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
