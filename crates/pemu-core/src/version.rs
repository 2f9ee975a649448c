//! Dotted numeric versions and the supported engine version range.
//!
//! Versions are compared component-wise with missing trailing components
//! treated as zero, so `1.2` and `1.2.0` are equal and `1.2` sorts before
//! `1.2.0.1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lowest engine version this tooling accepts.
pub const SUPPORTED_MIN_VERSION: &str = "1.12.0";

/// Highest engine version this tooling accepts.
pub const SUPPORTED_MAX_VERSION: &str = "1.13.99";

/// Errors produced while parsing a [`Version`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("version '{version}' has an empty component")]
    EmptyComponent { version: String },

    #[error("version '{version}' has a non-numeric component '{component}'")]
    InvalidComponent { version: String, component: String },
}

/// An ordered sequence of non-negative integers, e.g. `1.12.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    /// Build a version from already-parsed components.
    pub fn from_components(components: Vec<u64>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = trimmed
            .split('.')
            .map(|component| {
                if component.is_empty() {
                    return Err(VersionError::EmptyComponent {
                        version: trimmed.to_string(),
                    });
                }
                if !component.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::InvalidComponent {
                        version: trimmed.to_string(),
                        component: component.to_string(),
                    });
                }
                component
                    .parse::<u64>()
                    .map_err(|_| VersionError::InvalidComponent {
                        version: trimmed.to_string(),
                        component: component.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.components.iter().map(u64::to_string).collect();
        f.write_str(&rendered.join("."))
    }
}

/// Compare two versions, padding the shorter one with zeros.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    let length = a.components.len().max(b.components.len());
    for i in 0..length {
        let left = a.components.get(i).copied().unwrap_or(0);
        let right = b.components.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

/// Where a detected version falls relative to a [`SupportedRange`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    TooLow,
    Compatible,
    TooHigh,
}

/// Inclusive `[min, max]` range of supported engine versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportedRange {
    pub min: Version,
    pub max: Version,
}

impl SupportedRange {
    /// Create a range, rejecting `min > max`.
    pub fn new(min: Version, max: Version) -> Option<Self> {
        if min > max {
            return None;
        }
        Some(Self { min, max })
    }

    /// The range this build of the tooling supports.
    pub fn builtin() -> Self {
        Self {
            min: Version::from_components(vec![1, 12, 0]),
            max: Version::from_components(vec![1, 13, 99]),
        }
    }

    pub fn classify(&self, version: &Version) -> Compatibility {
        if version < &self.min {
            Compatibility::TooLow
        } else if version > &self.max {
            Compatibility::TooHigh
        } else {
            Compatibility::Compatible
        }
    }
}

impl Default for SupportedRange {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().expect("valid version")
    }

    #[test]
    fn test_compare_examples() {
        assert_eq!(compare(&v("1.12.0"), &v("1.13.99")), Ordering::Less);
        assert_eq!(compare(&v("1.13.99"), &v("1.13.99")), Ordering::Equal);
        assert_eq!(compare(&v("2.0"), &v("1.99.99")), Ordering::Greater);
        assert_eq!(compare(&v("1.2"), &v("1.2.0")), Ordering::Equal);
    }

    #[test]
    fn test_compare_unequal_arity() {
        assert_eq!(compare(&v("1.2"), &v("1.2.0.1")), Ordering::Less);
        assert_eq!(compare(&v("1.2.0.1"), &v("1.2")), Ordering::Greater);
        assert_eq!(compare(&v("3"), &v("3.0.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_compare_antisymmetric_and_reflexive() {
        let samples = ["0", "1.2", "1.2.0", "1.2.0.1", "1.10", "1.9.9", "2.0", "10.0.1"];
        for a in samples {
            assert_eq!(compare(&v(a), &v(a)), Ordering::Equal, "{a} vs itself");
            for b in samples {
                assert_eq!(
                    compare(&v(a), &v(b)),
                    compare(&v(b), &v(a)).reverse(),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert!(v("1.10.0") > v("1.9.0"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!("".parse::<Version>(), Err(VersionError::Empty));
        assert!(matches!(
            "1..2".parse::<Version>(),
            Err(VersionError::EmptyComponent { .. })
        ));
        assert!(matches!(
            "1.x.2".parse::<Version>(),
            Err(VersionError::InvalidComponent { .. })
        ));
        assert!(matches!(
            "1.-2".parse::<Version>(),
            Err(VersionError::InvalidComponent { .. })
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(v("1.12.0").to_string(), "1.12.0");
        assert_eq!(v(" 2.0 ").to_string(), "2.0");
    }

    #[test]
    fn test_builtin_range_matches_constants() {
        let range = SupportedRange::builtin();
        assert_eq!(range.min, v(SUPPORTED_MIN_VERSION));
        assert_eq!(range.max, v(SUPPORTED_MAX_VERSION));
    }

    #[test]
    fn test_classify() {
        let range = SupportedRange::builtin();
        assert_eq!(range.classify(&v("1.10.0")), Compatibility::TooLow);
        assert_eq!(range.classify(&v("1.14.0")), Compatibility::TooHigh);
        assert_eq!(range.classify(&v("1.12.5")), Compatibility::Compatible);
        assert_eq!(range.classify(&v("1.12")), Compatibility::Compatible);
        assert_eq!(range.classify(&v("1.13.99")), Compatibility::Compatible);
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(SupportedRange::new(v("2.0"), v("1.0")).is_none());
        assert!(SupportedRange::new(v("1.0"), v("1.0.0")).is_some());
    }
}
