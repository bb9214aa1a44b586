//! Sanitization of administrator-supplied redirect destinations.
//!
//! Both entry points are pure: they never panic and they never touch global
//! state. A rejection is an ordinary value; with the `audit-log` feature
//! enabled each rejection is also reported on the `gatehouse::audit` target.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::policy::errors::Rejected;

pub const MAX_PATH_LEN: usize = 100;

/// Substrings that may never appear in a relative redirect path (case-insensitive).
pub const DENIED_SEGMENTS: [&str; 6] = [
    "wp-admin",
    "wp-includes",
    "wp-content",
    "admin",
    "login",
    "wp-login",
];

const TRAVERSAL_SEQUENCES: [&str; 2] = ["../", "..\\"];

/// A relative path that passed [`validate_path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafePath(String);

impl SafePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An absolute http(s) URL that passed [`validate_url`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeUrl(String);

impl SafeUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate and normalize a site-relative redirect path such as `my-profile`.
pub fn validate_path(raw: &str) -> Result<SafePath, Rejected> {
    let mut path = raw.to_string();
    for seq in TRAVERSAL_SEQUENCES {
        path = path.replace(seq, "");
    }
    // Input that carried a traversal attempt is hostile even if the
    // remainder would be a legal path.
    if path.len() != raw.len() {
        return Err(audit(Rejected::Traversal, raw));
    }
    let path = path.trim_matches(|c: char| c == '/' || c == '\\' || c.is_whitespace());

    if path.is_empty() {
        return Err(audit(Rejected::Empty, raw));
    }

    if !path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
    {
        return Err(audit(Rejected::InvalidCharacters, raw));
    }

    if path.len() > MAX_PATH_LEN {
        return Err(audit(Rejected::TooLong { len: path.len() }, raw));
    }

    let lowered = path.to_ascii_lowercase();
    if let Some(segment) = DENIED_SEGMENTS
        .iter()
        .copied()
        .find(|s| lowered.contains(s))
    {
        return Err(audit(Rejected::DeniedSegment { segment }, raw));
    }

    Ok(SafePath(path.to_string()))
}

/// Validate an absolute redirect URL. Any host is accepted; only the scheme
/// is restricted to `http` and `https`.
pub fn validate_url(raw: &str) -> Result<SafeUrl, Rejected> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(audit(Rejected::Empty, raw));
    }

    // The value ends up in a Location header verbatim.
    if candidate.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(audit(Rejected::MalformedUrl, raw));
    }

    let parsed = Url::parse(candidate).map_err(|_| audit(Rejected::MalformedUrl, raw))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(audit(
            Rejected::UnsupportedScheme {
                scheme: scheme.to_string(),
            },
            raw,
        ));
    }

    // The parser invents a host for `http:example.com`; browsers resolve it
    // against the current site instead.
    let has_authority = candidate
        .get(scheme.len()..)
        .is_some_and(|rest| rest.starts_with("://"));
    if !has_authority || parsed.host_str().map_or(true, str::is_empty) {
        return Err(audit(Rejected::MissingHost, raw));
    }

    Ok(SafeUrl(candidate.to_string()))
}

#[cfg(feature = "audit-log")]
fn audit(reason: Rejected, input: &str) -> Rejected {
    tracing::warn!(target: "gatehouse::audit", input, %reason, "Blocked redirect input");
    reason
}

#[cfg(not(feature = "audit-log"))]
fn audit(reason: Rejected, _input: &str) -> Rejected {
    reason
}
