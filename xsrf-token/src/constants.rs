//! Fixed limits and defaults for CSRF tokens.

use std::time::Duration;

/// Maximum number of times a single token may be used.
pub const MAX_USES: u32 = 10;

/// Use count of a freshly generated token.
pub const START_USES: u32 = 0;

/// Default number of random bytes in a token identifier.
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Smallest accepted token identifier length in bytes (128 bits).
pub const MIN_TOKEN_LENGTH: usize = 16;

/// Largest accepted token identifier length in bytes.
///
/// Keeps the encoded cookie well under the 4 KiB browser limit.
pub const MAX_TOKEN_LENGTH: usize = 512;

/// Default token lifetime (1 hour).
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Largest accepted token lifetime (100 years).
///
/// Expiry has to stay within the four-digit years the wire timestamps carry.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 3600);
