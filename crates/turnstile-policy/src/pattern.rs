use std::fmt;

use regex::Regex;

use crate::error::{PolicyError, PolicyResult};

// ---------------------------------------------------------------------------
// NameMatcher — compiled-matcher abstraction
// ---------------------------------------------------------------------------

/// A compiled matcher over one request coordinate (role, class or method
/// name).
///
/// Policy entries hold matchers behind this trait so a host can substitute
/// its own matching convention for the standard regex-backed
/// [`AnchoredPattern`]. Implementations must be cheap to call and free of
/// interior mutability: a matcher is shared across concurrent evaluations.
pub trait NameMatcher: fmt::Debug + Send + Sync {
    /// Whether the matcher accepts the entire name.
    fn matches(&self, name: &str) -> bool;
}

// ---------------------------------------------------------------------------
// AnchoredPattern — full-match regular expression
// ---------------------------------------------------------------------------

/// A regular-expression matcher anchored at both ends.
///
/// The pattern is compiled as `^(?:pattern)$`, so `"Manager"` matches the
/// role `Manager` and nothing else; a substring hit like `AccountManager`
/// is not a match. The original pattern text is retained for display and
/// equality.
#[derive(Debug, Clone)]
pub struct AnchoredPattern {
    source: String,
    regex: Regex,
}

impl AnchoredPattern {
    /// Compile a pattern into an anchored matcher.
    pub fn compile(pattern: &str) -> PolicyResult<Self> {
        let regex =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| PolicyError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text as written, without the added anchors.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl NameMatcher for AnchoredPattern {
    fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl PartialEq for AnchoredPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for AnchoredPattern {}

impl fmt::Display for AnchoredPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
