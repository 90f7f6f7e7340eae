// xsrf - Stateless double-submit-cookie CSRF protection
//
// This library pairs self-describing, use-capped tokens with a per-request
// gate that decides whether to accept, reissue or reject.

// Re-export the gate
pub use xsrf_gate::*;

// Token codec and policy engine
pub use xsrf_token;
pub use xsrf_token::{CsrfToken, MAX_USES, TokenCodec, TokenError};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CookieOptions,
        CsrfCookie,
        CsrfDecision,
        CsrfGate,
        CsrfOptions,
        CsrfToken,
        ExclusionRule,
        ExpiredTokenPolicy,
        GateError,
        MAX_USES,
        RouteInfo,
        SameSite,
        SkipCsrf,
        TokenCodec,
        TokenError,
        TokenState,
    };
}
