//! The token cookie written back to the client, and lookup of the token in
//! an incoming `Cookie` header.

use crate::config::{CookieOptions, SameSite};
use std::fmt;

/// Cookie carrying a freshly issued or refreshed token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfCookie {
    name: String,
    value: String,
    secure: bool,
    same_site: SameSite,
    path: String,
    domain: Option<String>,
}

impl CsrfCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: &CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            secure: options.secure,
            same_site: options.same_site,
            path: options.path.clone(),
            domain: options.domain.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoded token to store in the cookie
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Always false; client script must be able to read the token.
    pub fn http_only(&self) -> bool {
        false
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn same_site(&self) -> SameSite {
        self.same_site
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut cookie = format!("{}={}; Path={}", self.name, self.value, self.path);

        if let Some(ref domain) = self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));

        cookie
    }
}

impl fmt::Display for CsrfCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Find the value of cookie `name` in a `Cookie` request header.
///
/// Pairs without `=` are skipped and double-quoted values are unquoted. The
/// first occurrence wins.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_defaults() {
        let cookie = CsrfCookie::new("XSRF-TOKEN", "abc", &CookieOptions::default());
        assert_eq!(
            cookie.to_header_value(),
            "XSRF-TOKEN=abc; Path=/; Secure; SameSite=Strict"
        );
        assert!(!cookie.http_only());
    }

    #[test]
    fn test_header_value_with_domain() {
        let options = CookieOptions {
            secure: false,
            same_site: SameSite::Lax,
            path: "/app".to_string(),
            domain: Some("example.com".to_string()),
        };
        let cookie = CsrfCookie::new("TEST-CSRF-TOKEN", "xyz", &options);

        assert_eq!(
            cookie.to_string(),
            "TEST-CSRF-TOKEN=xyz; Path=/app; Domain=example.com; SameSite=Lax"
        );
        assert_eq!(cookie.domain(), Some("example.com"));
        assert!(!cookie.secure());
    }

    #[test]
    fn test_find_cookie() {
        let header = "theme=dark; XSRF-TOKEN=abc123; session=\"quoted\"";
        assert_eq!(find_cookie(header, "XSRF-TOKEN"), Some("abc123"));
        assert_eq!(find_cookie(header, "session"), Some("quoted"));
        assert_eq!(find_cookie(header, "missing"), None);
        assert_eq!(find_cookie("flag; XSRF-TOKEN=", "XSRF-TOKEN"), Some(""));
    }

    #[test]
    fn test_find_cookie_is_case_sensitive() {
        assert_eq!(find_cookie("xsrf-token=abc", "XSRF-TOKEN"), None);
    }
}
