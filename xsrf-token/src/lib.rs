//! # XSRF Tokens
//!
//! Self-describing CSRF tokens for the double-submit-cookie pattern.
//!
//! A token is a small JSON document (`tokenID`, `releaseDate`,
//! `expirationDate`, `numUses`) encoded as base64url. Nothing is stored on
//! the server: the client carries the token in a cookie and echoes it back
//! in a header, and every piece of state needed to judge it travels with it.
//!
//! ## Features
//!
//! - **Random identifiers** - `tokenID` drawn from the thread-local CSPRNG
//! - **Expiry** - tokens carry their own expiration timestamp
//! - **Use cap** - a token may be used at most [`MAX_USES`] times
//! - **Constant-time comparison** - cookie and header copies compared with `subtle`
//!
//! ## Token Lifecycle
//!
//! ```rust
//! use xsrf_token::TokenCodec;
//!
//! let codec = TokenCodec::default();
//!
//! // Issue a new token
//! let token = codec.generate().unwrap();
//!
//! // Both copies must match byte for byte
//! assert!(codec.validate(&token, &token));
//!
//! // Each accepted request bumps the use count and re-encodes
//! let used = codec.use_token(&token).unwrap();
//! let decoded = codec.decode(&used).unwrap();
//! assert_eq!(decoded.use_count(), 1);
//! assert!(decoded.is_valid());
//! ```
//!
//! ## Use Cap
//!
//! ```rust
//! use xsrf_token::{MAX_USES, TokenCodec};
//!
//! let codec = TokenCodec::default();
//! let mut token = codec.decode(&codec.generate().unwrap()).unwrap();
//!
//! assert!(token.set_use_count(MAX_USES as i64).is_ok());
//! assert!(token.set_use_count(MAX_USES as i64 + 1).unwrap_err().is_max_uses_exceeded());
//! assert!(token.set_use_count(-1).unwrap_err().is_invalid_token());
//! ```

pub mod codec;
pub mod constants;
pub mod error;
pub mod token;

pub use codec::TokenCodec;
pub use constants::{
    DEFAULT_TOKEN_LENGTH, DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LENGTH, MAX_TOKEN_LIFETIME, MAX_USES,
    MIN_TOKEN_LENGTH, START_USES,
};
pub use error::{Result, TokenError};
pub use token::CsrfToken;
