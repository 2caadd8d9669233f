//! Migration version numbers.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A dotted version such as `1`, `1.2` or `2024_01_15`.
///
/// Parts may be separated by `.` or `_`. Trailing zero parts are not
/// significant, so `1.0` equals `1`. Ordering compares parts numerically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MigrationVersion {
    parts: Vec<u64>,
    display: String,
}

impl MigrationVersion {
    /// Parse a version string.
    pub fn parse(version: &str) -> CoreResult<Self> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidVersion {
                version: version.to_string(),
                reason: "version must not be empty".to_string(),
            });
        }

        let mut parts = trimmed
            .split(['.', '_'])
            .map(|part| {
                part.parse::<u64>().map_err(|e| CoreError::InvalidVersion {
                    version: version.to_string(),
                    reason: format!("'{part}' is not a number: {e}"),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        while parts.len() > 1 && parts.last() == Some(&0) {
            parts.pop();
        }

        Ok(Self {
            parts,
            display: trimmed.replace('_', "."),
        })
    }

    /// A single-part version such as `1`.
    pub fn from_number(number: u64) -> Self {
        Self {
            parts: vec![number],
            display: number.to_string(),
        }
    }

    /// The numeric parts, with trailing zeros removed.
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// The version as written, with `_` separators shown as `.`.
    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl PartialEq for MigrationVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for MigrationVersion {}

impl Hash for MigrationVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl FromStr for MigrationVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MigrationVersion {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<MigrationVersion> for String {
    fn from(version: MigrationVersion) -> Self {
        version.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> MigrationVersion {
        MigrationVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_dotted_and_underscored() {
        assert_eq!(v("1.2.3").parts(), &[1, 2, 3]);
        assert_eq!(v("1_2_3"), v("1.2.3"));
        assert_eq!(v("1_2_3").to_string(), "1.2.3");
    }

    #[test]
    fn test_trailing_zeros_are_insignificant() {
        assert_eq!(v("1.0"), v("1"));
        assert_eq!(v("1.0.0").parts(), &[1]);
        assert_eq!(v("0").parts(), &[0]);
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.999"));
        assert!(v("1.1") > v("1"));
        let mut versions = vec![v("10"), v("2"), v("1.1"), v("1")];
        versions.sort();
        let shown: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["1", "1.1", "2", "10"]);
    }

    #[test]
    fn test_invalid_versions() {
        assert!(MigrationVersion::parse("").is_err());
        assert!(MigrationVersion::parse("1.a").is_err());
        assert!(MigrationVersion::parse("1..2").is_err());
    }
}
