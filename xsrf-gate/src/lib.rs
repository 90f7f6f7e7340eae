//! # XSRF Gate
//!
//! Double-submit-cookie CSRF protection built on [`xsrf_token`].
//!
//! The server hands the client a token in a script-readable cookie; the
//! client echoes it back in a header. Because a cross-site attacker can make
//! the browser send the cookie but cannot read it or set the header, a
//! request is only trusted when both copies are present and identical.
//!
//! ## Features
//!
//! - **Stateless** - tokens are self-describing, no server-side store
//! - **Use-capped tokens** - every accepted request records a use and refreshes the cookie
//! - **Route exclusion** - exact paths or `prefix/*` wildcards, plus a per-route opt out
//! - **Framework agnostic** - a pure decision function, with an adapter for `http` types
//!
//! ## Quick Start
//!
//! ```rust
//! use xsrf_gate::{CsrfGate, CsrfOptions, RouteInfo, TokenState};
//!
//! let gate = CsrfGate::new(
//!     CsrfOptions::new().with_exclude_routes(["/health", "/api/public/*"]),
//! )
//! .unwrap();
//!
//! // First visit: no token anywhere, one is issued
//! let decision = gate.evaluate(&RouteInfo::new("/api/data"), None, None);
//! assert_eq!(decision.state(), Some(TokenState::NoTokenPresent));
//! let cookie = decision.cookie().unwrap().clone();
//!
//! // Next request echoes the cookie value in the header
//! let decision = gate.evaluate(
//!     &RouteInfo::new("/api/data"),
//!     Some(cookie.value()),
//!     Some(cookie.value()),
//! );
//! assert!(decision.is_allowed());
//!
//! // A forged header is rejected
//! let decision = gate.evaluate(&RouteInfo::new("/api/data"), Some(cookie.value()), Some("forged"));
//! assert_eq!(decision.error().unwrap().to_string(), "Token mismatch");
//! ```
//!
//! ## Usage with `http`
//!
//! ```rust
//! use http::{Request, Response};
//! use xsrf_gate::{CsrfGate, CsrfOptions, middleware::protect};
//!
//! let gate = CsrfGate::new(CsrfOptions::default()).unwrap();
//! let request = Request::builder().uri("/api/data").body(()).unwrap();
//!
//! let response = protect(&gate, request, |_req| Response::new("hello".to_string()));
//! assert!(response.headers().contains_key(http::header::SET_COOKIE));
//! ```

pub mod config;
pub mod cookie;
pub mod error;
pub mod exclusion;
pub mod gate;
pub mod middleware;

pub use config::{
    CookieOptions, CsrfOptions, DEFAULT_COOKIE_NAME, DEFAULT_COOKIE_PATH, DEFAULT_HEADER_NAME,
    ExpiredTokenPolicy, SameSite,
};
pub use cookie::CsrfCookie;
pub use error::{GateError, Result, TOKEN_EXPIRED_MESSAGE, TOKEN_MISMATCH_MESSAGE};
pub use exclusion::{ExclusionRule, RouteInfo};
pub use gate::{CsrfDecision, CsrfGate, HandlerToken, TokenState};
pub use middleware::SkipCsrf;
