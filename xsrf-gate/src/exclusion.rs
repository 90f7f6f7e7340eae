//! Route exclusion rules.
//!
//! A rule is either an exact path or a prefix written with a trailing `*`
//! (`/api/public/*`). Requests on an excluded route skip CSRF checking
//! entirely.

use serde::Deserialize;
use std::fmt;

/// Marker for a wildcard rule
const WILDCARD: char = '*';

/// A route pattern under which CSRF checking is bypassed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ExclusionRule {
    /// Matches exactly this path
    Exact(String),
    /// Matches any path starting with this prefix
    Prefix(String),
}

impl ExclusionRule {
    /// Parse a pattern; a trailing `*` makes it a prefix rule.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix(WILDCARD) {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    /// Check if `path` falls under this rule
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

impl From<String> for ExclusionRule {
    fn from(pattern: String) -> Self {
        Self::parse(&pattern)
    }
}

impl From<&str> for ExclusionRule {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(exact) => write!(f, "{}", exact),
            Self::Prefix(prefix) => write!(f, "{}{}", prefix, WILDCARD),
        }
    }
}

/// What the gate needs to know about the matched route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Request path
    pub path: String,
    /// Route opted out of CSRF checking by its handler
    pub skip_csrf: bool,
}

impl RouteInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            skip_csrf: false,
        }
    }

    /// Mark the route as opted out of CSRF checking
    pub fn skip_csrf(mut self) -> Self {
        self.skip_csrf = true;
        self
    }
}

impl From<&str> for RouteInfo {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
