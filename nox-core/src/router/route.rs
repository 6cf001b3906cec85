//! Route declarations and their compiled matchers
//!
//! A [`Route`] pairs an HTTP method with a path that is either compared
//! literally or matched as a regular expression. A [`RouteBase`] is the
//! controller-level prefix that must match before any of the controller's
//! routes are looked at.
//!
//! Regex routes must match the whole (baseless) path; regex bases must
//! match at the start of the path. Named groups (`(?P<id>\d+)`) become
//! request parameters.

use regex::Regex;

use super::ConfigError;

/// Method + path a controller method answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: String,
    pattern: String,
    is_regex: bool,
}

impl Route {
    /// Plain route, compared by exact equality
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self { method: method.as_ref().to_uppercase(), pattern: path.into(), is_regex: false }
    }

    /// Regex route, full-matched against the path
    pub fn regex(method: impl AsRef<str>, pattern: impl Into<String>) -> Self {
        Self { method: method.as_ref().to_uppercase(), pattern: pattern.into(), is_regex: true }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_regex(&self) -> bool {
        self.is_regex
    }

    pub fn matches_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }
}

/// Controller-level path prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBase {
    pattern: String,
    is_regex: bool,
}

impl RouteBase {
    /// Plain prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { pattern: prefix.into(), is_regex: false }
    }

    /// Regex prefix, anchored at the start of the path
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), is_regex: true }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_regex(&self) -> bool {
        self.is_regex
    }
}

/// Named captures produced by a successful match
pub type Captures = Vec<(String, String)>;

/// A pattern compiled at load time
#[derive(Debug, Clone)]
pub(crate) enum PathMatcher {
    Exact(String),
    Pattern(Regex),
}

impl PathMatcher {
    fn compile(pattern: &str, anchored: String) -> Result<Regex, ConfigError> {
        Regex::new(&anchored).map_err(|e| ConfigError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
    }

    /// Matcher for a whole path
    pub(crate) fn full(pattern: &str, is_regex: bool) -> Result<Self, ConfigError> {
        if is_regex {
            Ok(Self::Pattern(Self::compile(pattern, format!("^(?:{})$", pattern))?))
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    /// Matcher for a path prefix
    pub(crate) fn prefix(pattern: &str, is_regex: bool) -> Result<Self, ConfigError> {
        if is_regex {
            Ok(Self::Pattern(Self::compile(pattern, format!("^(?:{})", pattern))?))
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    pub(crate) fn is_regex(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }

    /// Full match; `None` when the path does not match
    pub(crate) fn match_full(&self, path: &str) -> Option<Captures> {
        match self {
            Self::Exact(expected) => (expected == path).then(Vec::new),
            Self::Pattern(regex) => {
                let captures = regex.captures(path)?;
                Some(named_captures(regex, &captures))
            }
        }
    }

    /// Prefix match; returns the remainder of the path and the captures
    pub(crate) fn strip_prefix<'p>(&self, path: &'p str) -> Option<(&'p str, Captures)> {
        match self {
            Self::Exact(prefix) => path.strip_prefix(prefix.as_str()).map(|rest| (rest, Vec::new())),
            Self::Pattern(regex) => {
                let captures = regex.captures(path)?;
                let end = captures.get(0).map(|m| m.end()).unwrap_or_default();
                Some((&path[end..], named_captures(regex, &captures)))
            }
        }
    }
}

fn named_captures(regex: &Regex, captures: &regex::Captures<'_>) -> Captures {
    regex
        .capture_names()
        .flatten()
        .filter_map(|name| captures.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
        .collect()
}
