use crate::constants::MAX_USES;
use crate::error::{Result, TokenError};
use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// base64url without padding on encode, padding-agnostic on decode.
pub(crate) const WIRE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Last year a wire timestamp can carry.
pub(crate) const MAX_WIRE_YEAR: i32 = 9999;

/// Keys every wire payload must carry, in the order they are checked.
const REQUIRED_FIELDS: [&str; 4] = ["tokenID", "releaseDate", "expirationDate", "numUses"];

/// CSRF token with metadata
///
/// The identifier and both timestamps are fixed at creation; only the use
/// count changes, and every change goes through [`CsrfToken::set_use_count`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    token_id: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    use_count: u32,
}

/// JSON shape of a token on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    #[serde(rename = "tokenID")]
    token_id: String,
    #[serde(rename = "releaseDate", with = "iso_millis")]
    release_date: DateTime<Utc>,
    #[serde(rename = "expirationDate", with = "iso_millis")]
    expiration_date: DateTime<Utc>,
    #[serde(rename = "numUses")]
    num_uses: i64,
}

impl CsrfToken {
    /// Build a token, running the use-count guard on `use_count`.
    pub fn new(
        token_id: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        use_count: i64,
    ) -> Result<Self> {
        let mut token = Self {
            token_id: token_id.into(),
            issued_at,
            expires_at,
            use_count: 0,
        };
        token.set_use_count(use_count)?;
        Ok(token)
    }

    pub(crate) fn fresh(
        token_id: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        use_count: u32,
    ) -> Self {
        Self {
            token_id,
            issued_at,
            expires_at,
            use_count,
        }
    }

    /// Random identifier of this token
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Issue timestamp
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Expiration timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Number of times this token has been used
    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    /// Uses left before the cap is reached
    pub fn remaining_uses(&self) -> u32 {
        MAX_USES - self.use_count
    }

    /// Set the use count.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidToken`] for a negative count and
    /// [`TokenError::MaxUsesExceeded`] for a count above [`MAX_USES`].
    /// The token is left untouched on error.
    pub fn set_use_count(&mut self, use_count: i64) -> Result<()> {
        if use_count < 0 {
            return Err(TokenError::invalid("Invalid numUses"));
        }

        if use_count > i64::from(MAX_USES) {
            return Err(TokenError::max_uses(format!(
                "Current uses ({}) exceeds the max of {}",
                use_count, MAX_USES
            )));
        }

        self.use_count = use_count as u32;
        Ok(())
    }

    /// Consume the token and return it with a new use count.
    pub fn with_use_count(mut self, use_count: i64) -> Result<Self> {
        self.set_use_count(use_count)?;
        Ok(self)
    }

    /// Record one use, failing once the cap has been reached.
    pub fn record_use(&mut self) -> Result<()> {
        self.set_use_count(i64::from(self.use_count) + 1)
    }

    /// Check if the token is still valid
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Check validity against an explicit clock reading.
    ///
    /// A token is valid only while its expiration lies strictly after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > chrono::TimeDelta::zero()
    }

    /// Encode token to its opaque wire string
    pub fn encode(&self) -> Result<String> {
        let payload = TokenPayload {
            token_id: self.token_id.clone(),
            release_date: self.issued_at,
            expiration_date: self.expires_at,
            num_uses: i64::from(self.use_count),
        };

        let json = serde_json::to_vec(&payload)
            .map_err(|e| TokenError::invalid(format!("Failed to serialize token: {}", e)))?;

        Ok(WIRE_ENGINE.encode(json))
    }

    /// Decode a wire string back into a token.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidToken`] when the string is not base64url, not a
    /// JSON object, or lacks one of `tokenID`, `releaseDate`,
    /// `expirationDate`, `numUses`. A payload whose `numUses` is out of range
    /// fails the same way [`CsrfToken::set_use_count`] does.
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = WIRE_ENGINE
            .decode(encoded)
            .map_err(|e| TokenError::invalid(format!("Malformed token encoding: {}", e)))?;

        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| TokenError::invalid(format!("Malformed token payload: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| TokenError::invalid("Token payload is not an object"))?;

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(TokenError::invalid(format!(
                    "No {} present in payload",
                    field
                )));
            }
        }

        let payload: TokenPayload = serde_json::from_value(value)
            .map_err(|e| TokenError::invalid(format!("Malformed token payload: {}", e)))?;

        Self::new(
            payload.token_id,
            payload.release_date,
            payload.expiration_date,
            payload.num_uses,
        )
    }
}

impl FromStr for CsrfToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl fmt::Display for CsrfToken {
    // Only a prefix of the identifier, so tokens can be logged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.token_id.chars().take(8).collect();
        write!(
            f,
            "CsrfToken({}..., uses={}/{}, expires={})",
            prefix,
            self.use_count,
            MAX_USES,
            self.expires_at.to_rfc3339()
        )
    }
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix.
mod iso_millis {
    use super::MAX_WIRE_YEAR;
    use chrono::{DateTime, Datelike, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error, ser};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        if !(0..=MAX_WIRE_YEAR).contains(&value.year()) {
            return Err(<S::Error as ser::Error>::custom(format!(
                "timestamp {} is outside years 0000-{}",
                value, MAX_WIRE_YEAR
            )));
        }
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}
