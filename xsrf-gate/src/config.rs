use crate::error::{GateError, Result};
use crate::exclusion::ExclusionRule;
use http::HeaderName;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::warn;
use xsrf_token::{
    DEFAULT_TOKEN_LENGTH, DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LENGTH, MAX_TOKEN_LIFETIME,
    MIN_TOKEN_LENGTH, TokenCodec,
};

pub const DEFAULT_COOKIE_NAME: &str = "XSRF-TOKEN";
pub const DEFAULT_HEADER_NAME: &str = "x-csrf-token";
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// CSRF gate configuration
///
/// Every field has a default; deserializing accepts the camelCase option
/// names (`cookieName`, `headerName`, `tokenLength`, `tokenLifetimeMs`,
/// `excludeRoutes`, `cookieOptions`, `expiredTokenPolicy`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CsrfOptions {
    /// Cookie carrying the token
    pub cookie_name: String,

    /// Header the client mirrors the token into (matched case-insensitively)
    pub header_name: String,

    /// Random bytes in each token identifier
    pub token_length: usize,

    /// Token lifetime
    #[serde(rename = "tokenLifetimeMs", deserialize_with = "duration_from_millis")]
    pub token_lifetime: Duration,

    /// Routes that bypass CSRF checking
    pub exclude_routes: Vec<ExclusionRule>,

    /// Attributes of the cookie written back to the client
    pub cookie_options: CookieOptions,

    /// What to do with a matching but expired token pair
    pub expired_token_policy: ExpiredTokenPolicy,
}

/// Attributes of the token cookie.
///
/// The cookie is never `HttpOnly`: client script has to read it to copy the
/// value into the request header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieOptions {
    /// Cookie secure flag (HTTPS only)
    pub secure: bool,

    /// Cookie SameSite policy
    pub same_site: SameSite,

    /// Cookie path
    pub path: String,

    /// Cookie domain
    pub domain: Option<String>,
}

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Handling of a cookie/header pair that matches but carries an expired token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpiredTokenPolicy {
    /// Issue a fresh token and let the request through
    #[default]
    Reissue,
    /// Issue a fresh token but reject the request
    Reject,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            secure: true,
            same_site: SameSite::Strict,
            path: DEFAULT_COOKIE_PATH.to_string(),
            domain: None,
        }
    }
}

impl Default for CsrfOptions {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            token_length: DEFAULT_TOKEN_LENGTH,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            exclude_routes: Vec::new(),
            cookie_options: CookieOptions::default(),
            expired_token_policy: ExpiredTokenPolicy::default(),
        }
    }
}

impl CsrfOptions {
    /// Create options with every default applied
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GateError::config(e.to_string()))
    }

    /// Set cookie name
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set token length in bytes
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// Set token lifetime
    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Add excluded routes
    pub fn with_exclude_routes(
        mut self,
        routes: impl IntoIterator<Item = impl Into<ExclusionRule>>,
    ) -> Self {
        self.exclude_routes.extend(routes.into_iter().map(Into::into));
        self
    }

    /// Replace all cookie attributes
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    /// Set cookie secure flag
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_options.secure = secure;
        self
    }

    /// Set cookie SameSite policy
    pub fn with_cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_options.same_site = same_site;
        self
    }

    /// Set cookie path
    pub fn with_cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_options.path = path.into();
        self
    }

    /// Set cookie domain
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_options.domain = Some(domain.into());
        self
    }

    /// Set expired token policy
    pub fn with_expired_token_policy(mut self, policy: ExpiredTokenPolicy) -> Self {
        self.expired_token_policy = policy;
        self
    }

    /// Check if a path matches any exclusion rule
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_routes.iter().any(|rule| rule.matches(path))
    }

    /// Token codec configured from these options
    pub fn codec(&self) -> TokenCodec {
        TokenCodec::new(self.token_length).with_lifetime(self.token_lifetime)
    }

    /// Reject option combinations the gate cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.trim().is_empty() {
            return Err(GateError::config("Cookie name must not be empty"));
        }

        if !is_cookie_name(&self.cookie_name) {
            return Err(GateError::config(format!(
                "Cookie name {:?} contains characters not allowed in a cookie name",
                self.cookie_name
            )));
        }

        if self.header_name.trim().is_empty() {
            return Err(GateError::config("Header name must not be empty"));
        }

        if HeaderName::from_bytes(self.header_name.as_bytes()).is_err() {
            return Err(GateError::config(format!(
                "Header name {:?} is not a valid HTTP header name",
                self.header_name
            )));
        }

        if !is_cookie_attribute(&self.cookie_options.path) {
            return Err(GateError::config(format!(
                "Cookie path {:?} contains characters not allowed in a cookie attribute",
                self.cookie_options.path
            )));
        }

        if let Some(ref domain) = self.cookie_options.domain
            && !is_cookie_attribute(domain)
        {
            return Err(GateError::config(format!(
                "Cookie domain {:?} contains characters not allowed in a cookie attribute",
                domain
            )));
        }

        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&self.token_length) {
            return Err(GateError::config(format!(
                "Token length must be between {} and {} bytes, got {}",
                MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH, self.token_length
            )));
        }

        if self.token_lifetime.is_zero() {
            return Err(GateError::config("Token lifetime must be greater than zero"));
        }

        if self.token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(GateError::config(format!(
                "Token lifetime must be at most {}s, got {}s",
                MAX_TOKEN_LIFETIME.as_secs(),
                self.token_lifetime.as_secs()
            )));
        }

        if self.cookie_options.same_site == SameSite::None && !self.cookie_options.secure {
            warn!(
                cookie = %self.cookie_name,
                "SameSite=None without Secure; browsers will drop the CSRF cookie"
            );
        }

        Ok(())
    }
}

/// RFC 6265 cookie-name token: visible ASCII without separators
fn is_cookie_name(name: &str) -> bool {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";
    name.bytes()
        .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}

/// Attribute values may not contain control characters or `;`
fn is_cookie_attribute(value: &str) -> bool {
    value.bytes().all(|b| (b == b' ' || b.is_ascii_graphic()) && b != b';')
}

fn duration_from_millis<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CsrfOptions::default();
        assert_eq!(options.cookie_name, "XSRF-TOKEN");
        assert_eq!(options.header_name, "x-csrf-token");
        assert_eq!(options.token_length, 32);
        assert_eq!(options.token_lifetime, Duration::from_secs(3600));
        assert!(options.exclude_routes.is_empty());
        assert!(options.cookie_options.secure);
        assert_eq!(options.cookie_options.same_site, SameSite::Strict);
        assert_eq!(options.cookie_options.path, "/");
        assert!(options.cookie_options.domain.is_none());
        assert_eq!(options.expired_token_policy, ExpiredTokenPolicy::Reissue);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = CsrfOptions::new()
            .with_cookie_name("TEST-CSRF-TOKEN")
            .with_header_name("X-TEST-CSRF-TOKEN")
            .with_exclude_routes(["/health", "/api/public/*"])
            .with_cookie_domain("example.com")
            .with_cookie_same_site(SameSite::Lax)
            .with_token_lifetime(Duration::from_secs(60));

        assert_eq!(options.cookie_name, "TEST-CSRF-TOKEN");
        assert_eq!(options.header_name, "X-TEST-CSRF-TOKEN");
        assert_eq!(options.exclude_routes.len(), 2);
        assert_eq!(options.cookie_options.domain.as_deref(), Some("example.com"));
        assert_eq!(options.cookie_options.same_site, SameSite::Lax);
        assert_eq!(options.codec().lifetime(), Duration::from_secs(60));
    }

    #[test]
    fn test_is_excluded() {
        let options = CsrfOptions::new().with_exclude_routes(["/health", "/api/public/*"]);
        assert!(options.is_excluded("/health"));
        assert!(options.is_excluded("/api/public/users"));
        assert!(!options.is_excluded("/api/private/users"));
    }

    #[test]
    fn test_from_json_partial() {
        let options = CsrfOptions::from_json(
            r#"{
                "cookieName": "TEST-TOKEN",
                "excludeRoutes": ["/health"],
                "cookieOptions": { "sameSite": "lax", "domain": "example.com" },
                "tokenLifetimeMs": 60000
            }"#,
        )
        .unwrap();

        assert_eq!(options.cookie_name, "TEST-TOKEN");
        assert_eq!(options.header_name, DEFAULT_HEADER_NAME);
        assert_eq!(options.exclude_routes, vec![ExclusionRule::parse("/health")]);
        assert!(options.cookie_options.secure);
        assert_eq!(options.cookie_options.same_site, SameSite::Lax);
        assert_eq!(options.cookie_options.path, "/");
        assert_eq!(options.token_lifetime, Duration::from_secs(60));
    }

    #[test]
    fn test_from_json_rejects_unknown_same_site() {
        let err = CsrfOptions::from_json(r#"{"cookieOptions": {"sameSite": "sometimes"}}"#)
            .unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CsrfOptions::new().with_cookie_name("").validate().is_err());
        assert!(CsrfOptions::new().with_header_name("  ").validate().is_err());
        assert!(CsrfOptions::new().with_token_length(4).validate().is_err());
        assert!(CsrfOptions::new().with_token_length(4096).validate().is_err());
        assert!(
            CsrfOptions::new()
                .with_token_lifetime(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_lifetime() {
        let err = CsrfOptions::from_json(r#"{"tokenLifetimeMs": 1000000000000000}"#)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(matches!(err, GateError::Config(_)));

        assert!(
            CsrfOptions::new()
                .with_token_lifetime(Duration::MAX)
                .validate()
                .is_err()
        );
        assert!(
            CsrfOptions::new()
                .with_token_lifetime(MAX_TOKEN_LIFETIME)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        for name in ["XSRF\nTOKEN", "XSRF TOKEN", "XSRF;TOKEN", "XSRF=TOKEN", "\"XSRF\""] {
            let err = CsrfOptions::new().with_cookie_name(name).validate().unwrap_err();
            assert!(matches!(err, GateError::Config(_)), "cookie name {:?}", name);
        }

        for name in ["x-csrf\ntoken", "x csrf", "x-csrf:token"] {
            let err = CsrfOptions::new().with_header_name(name).validate().unwrap_err();
            assert!(matches!(err, GateError::Config(_)), "header name {:?}", name);
        }

        assert!(CsrfOptions::new().with_cookie_path("/; HttpOnly").validate().is_err());
        assert!(CsrfOptions::new().with_cookie_domain("a.com\r\n").validate().is_err());
        assert!(
            CsrfOptions::new()
                .with_cookie_name("__Host-XSRF_TOKEN")
                .with_header_name("X-XSRF-TOKEN")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_same_site_enum() {
        assert_eq!(SameSite::Strict.as_str(), "Strict");
        assert_eq!(SameSite::Lax.as_str(), "Lax");
        assert_eq!(SameSite::None.as_str(), "None");
    }
}
