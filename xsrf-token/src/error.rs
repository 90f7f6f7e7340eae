use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed wire string, missing payload field or negative use count
    #[error("Invalid CSRF token: {0}")]
    InvalidToken(String),

    /// Use count would exceed [`MAX_USES`](crate::MAX_USES)
    #[error("CSRF token max uses exceeded: {0}")]
    MaxUsesExceeded(String),
}

impl TokenError {
    /// Create an invalid token error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Create a max uses error
    pub fn max_uses<S: Into<String>>(msg: S) -> Self {
        Self::MaxUsesExceeded(msg.into())
    }

    /// Check if this is an invalid token error
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken(_))
    }

    /// Check if this is a max uses error
    pub fn is_max_uses_exceeded(&self) -> bool {
        matches!(self, Self::MaxUsesExceeded(_))
    }

    /// The message carried by the error, without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidToken(msg) | Self::MaxUsesExceeded(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;
