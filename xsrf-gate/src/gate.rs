//! Per-request CSRF decision.
//!
//! The gate looks at one request's cookie and header copies of the token and
//! decides, in this order:
//!
//! 1. excluded or opted-out route: bypass, nothing written
//! 2. neither copy present: issue a token, accept
//! 3. copies differ (or only one present): reject with "Token mismatch"
//! 4. copies match but the token has expired: issue a new token, then accept
//!    or reject according to [`ExpiredTokenPolicy`]
//! 5. copies match and the token is live: record a use, accept; a token at
//!    its use cap rejects the request

use crate::config::{CsrfOptions, ExpiredTokenPolicy};
use crate::cookie::CsrfCookie;
use crate::error::{GateError, Result};
use crate::exclusion::RouteInfo;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use xsrf_token::TokenCodec;

/// Token state observed on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Neither cookie nor header carried a token
    NoTokenPresent,
    /// Matching, unexpired pair
    TokenPairPresentValid,
    /// Pair differs or is incomplete
    TokenPairPresentMismatch,
    /// Matching pair whose token has expired
    TokenPairPresentExpired,
}

/// Outcome of evaluating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfDecision {
    /// Route is excluded; no token logic ran
    Bypass,
    /// Request is allowed
    Accept {
        state: TokenState,
        /// Cookie the response must carry
        cookie: CsrfCookie,
    },
    /// Request is rejected
    Reject {
        /// `None` when the submitted token could not be decoded
        state: Option<TokenState>,
        error: GateError,
        /// Replacement cookie, set only when an expired token is rejected
        cookie: Option<CsrfCookie>,
    },
}

impl CsrfDecision {
    /// Check if the request may proceed
    pub fn is_allowed(&self) -> bool {
        !self.is_rejected()
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }

    pub fn is_bypassed(&self) -> bool {
        matches!(self, Self::Bypass)
    }

    /// Token state behind the decision, if any token logic ran
    pub fn state(&self) -> Option<TokenState> {
        match self {
            Self::Bypass => None,
            Self::Accept { state, .. } => Some(*state),
            Self::Reject { state, .. } => *state,
        }
    }

    /// Cookie to write into the response
    pub fn cookie(&self) -> Option<&CsrfCookie> {
        match self {
            Self::Bypass => None,
            Self::Accept { cookie, .. } => Some(cookie),
            Self::Reject { cookie, .. } => cookie.as_ref(),
        }
    }

    /// Rejection reason
    pub fn error(&self) -> Option<&GateError> {
        match self {
            Self::Reject { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Convert into a `Result`, dropping the replacement cookie of a rejection.
    pub fn into_result(self) -> Result<Option<CsrfCookie>> {
        match self {
            Self::Bypass => Ok(None),
            Self::Accept { cookie, .. } => Ok(Some(cookie)),
            Self::Reject { error, .. } => Err(error),
        }
    }
}

/// Token a request handler should embed in its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerToken {
    /// Encoded token
    pub value: String,
    /// Cookie to set when the token was freshly issued
    pub cookie: Option<CsrfCookie>,
}

/// Double-submit-cookie CSRF gate
#[derive(Debug, Clone)]
pub struct CsrfGate {
    options: Arc<CsrfOptions>,
    codec: TokenCodec,
}

impl CsrfGate {
    /// Create a gate, validating `options` first
    pub fn new(options: CsrfOptions) -> Result<Self> {
        options.validate()?;

        debug!(
            cookie = %options.cookie_name,
            header = %options.header_name,
            excluded_routes = options.exclude_routes.len(),
            policy = ?options.expired_token_policy,
            "Creating CSRF gate"
        );

        let codec = options.codec();
        Ok(Self {
            options: Arc::new(options),
            codec,
        })
    }

    pub fn options(&self) -> &CsrfOptions {
        &self.options
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Check if CSRF checking is skipped for a route
    pub fn is_excluded(&self, route: &RouteInfo) -> bool {
        route.skip_csrf || self.options.is_excluded(&route.path)
    }

    /// Evaluate a request against the current time
    pub fn evaluate(
        &self,
        route: &RouteInfo,
        cookie_token: Option<&str>,
        header_token: Option<&str>,
    ) -> CsrfDecision {
        self.evaluate_at(route, cookie_token, header_token, Utc::now())
    }

    /// Evaluate a request against an explicit clock reading.
    ///
    /// Empty strings count as absent tokens.
    pub fn evaluate_at(
        &self,
        route: &RouteInfo,
        cookie_token: Option<&str>,
        header_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> CsrfDecision {
        if self.is_excluded(route) {
            debug!(path = %route.path, "Route excluded from CSRF protection");
            return CsrfDecision::Bypass;
        }

        let cookie_token = cookie_token.filter(|t| !t.is_empty());
        let header_token = header_token.filter(|t| !t.is_empty());

        if cookie_token.is_none() && header_token.is_none() {
            trace!(path = %route.path, "No CSRF token present, issuing one");
            return self.issue(TokenState::NoTokenPresent, now);
        }

        let cookie_token = cookie_token.unwrap_or_default();
        if !self
            .codec
            .validate(cookie_token, header_token.unwrap_or_default())
        {
            warn!(
                path = %route.path,
                cookie_present = !cookie_token.is_empty(),
                header_present = header_token.is_some(),
                "CSRF token mismatch"
            );
            return CsrfDecision::Reject {
                state: Some(TokenState::TokenPairPresentMismatch),
                error: GateError::token_mismatch(),
                cookie: None,
            };
        }

        let token = match self.codec.decode(cookie_token) {
            Ok(token) => token,
            Err(e) => {
                warn!(path = %route.path, error = %e, "Undecodable CSRF token");
                return CsrfDecision::Reject {
                    state: None,
                    error: e.into(),
                    cookie: None,
                };
            }
        };

        if !token.is_valid_at(now) {
            debug!(path = %route.path, token = %token, "CSRF token expired, reissuing");
            return match self.options.expired_token_policy {
                ExpiredTokenPolicy::Reissue => self.issue(TokenState::TokenPairPresentExpired, now),
                ExpiredTokenPolicy::Reject => CsrfDecision::Reject {
                    state: Some(TokenState::TokenPairPresentExpired),
                    error: GateError::token_expired(),
                    cookie: self.issue_cookie(now).ok(),
                },
            };
        }

        match self.codec.use_token(cookie_token) {
            Ok(refreshed) => {
                trace!(path = %route.path, uses = token.use_count() + 1, "CSRF token refreshed");
                CsrfDecision::Accept {
                    state: TokenState::TokenPairPresentValid,
                    cookie: self.cookie(refreshed),
                }
            }
            Err(e) => {
                warn!(path = %route.path, error = %e, "CSRF token rejected");
                CsrfDecision::Reject {
                    state: Some(TokenState::TokenPairPresentValid),
                    error: e.into(),
                    cookie: None,
                }
            }
        }
    }

    /// Token for a handler to embed, e.g. in a rendered form.
    ///
    /// Returns the cookie's token when one is present, otherwise issues a
    /// new token along with the cookie that must be set.
    pub fn handler_token(&self, cookie_token: Option<&str>) -> Result<HandlerToken> {
        match cookie_token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(HandlerToken {
                value: token.to_string(),
                cookie: None,
            }),
            None => {
                let cookie = self.issue_cookie(Utc::now())?;
                Ok(HandlerToken {
                    value: cookie.value().to_string(),
                    cookie: Some(cookie),
                })
            }
        }
    }

    fn issue(&self, state: TokenState, now: DateTime<Utc>) -> CsrfDecision {
        match self.issue_cookie(now) {
            Ok(cookie) => CsrfDecision::Accept { state, cookie },
            Err(error) => {
                warn!(error = %error, "Failed to issue CSRF token");
                CsrfDecision::Reject {
                    state: Some(state),
                    error,
                    cookie: None,
                }
            }
        }
    }

    /// New token, already used once, wrapped in the configured cookie
    fn issue_cookie(&self, now: DateTime<Utc>) -> Result<CsrfCookie> {
        let token = self.codec.generate_at(now)?;
        let token = self.codec.use_token(&token)?;
        Ok(self.cookie(token))
    }

    /// Gate over options that skipped validation
    #[cfg(test)]
    pub(crate) fn unchecked(options: CsrfOptions) -> Self {
        let codec = options.codec();
        Self {
            options: Arc::new(options),
            codec,
        }
    }

    fn cookie(&self, value: String) -> CsrfCookie {
        CsrfCookie::new(
            self.options.cookie_name.clone(),
            value,
            &self.options.cookie_options,
        )
    }
}
