use thiserror::Error;
use xsrf_token::TokenError;

/// Message carried by every token mismatch rejection.
pub const TOKEN_MISMATCH_MESSAGE: &str = "Token mismatch";

/// Message carried by an expired-token rejection.
pub const TOKEN_EXPIRED_MESSAGE: &str = "Token expired";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Cookie and header copies differ, or one of them is missing
    #[error("{0}")]
    TokenMismatch(String),

    /// Matching pair whose token has expired (only under `ExpiredTokenPolicy::Reject`)
    #[error("{0}")]
    TokenExpired(String),

    /// The submitted token cannot be trusted or has reached its use cap
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Invalid CSRF configuration: {0}")]
    Config(String),
}

impl GateError {
    pub fn token_mismatch() -> Self {
        Self::TokenMismatch(TOKEN_MISMATCH_MESSAGE.to_string())
    }

    pub fn token_expired() -> Self {
        Self::TokenExpired(TOKEN_EXPIRED_MESSAGE.to_string())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status the hosting framework should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            _ => 403,
        }
    }

    /// Whether the error rejects the request as forbidden
    pub fn is_forbidden(&self) -> bool {
        self.status_code() == 403
    }

    pub fn is_token_mismatch(&self) -> bool {
        matches!(self, Self::TokenMismatch(_))
    }

    pub fn is_max_uses_exceeded(&self) -> bool {
        matches!(self, Self::Token(e) if e.is_max_uses_exceeded())
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
