//! Dotted-numeric version parsing and comparison.

use crate::error::SetupError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A version such as `3.28.1`, stored as its numeric components.
///
/// Components are kept as digit strings without leading zeros, so they have no
/// upper bound. Equality is structural (`1.2 != 1.2.0`), while
/// [`Version::compare`] only looks at the positions both versions have.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(Vec<String>);

impl Version {
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Compares two versions position by position.
    ///
    /// The first differing position decides the result. Positions present in only
    /// one of the versions are never examined, so `1.2` and `1.2.0` compare equal.
    pub fn compare(&self, other: &Version) -> Ordering {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| compare_component(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// True if this version is not older than `minimum`.
    pub fn satisfies(&self, minimum: &Version) -> bool {
        self.compare(minimum) != Ordering::Less
    }
}

impl FromStr for Version {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(SetupError::InvalidVersion(s.to_string()));
                }
                let trimmed = part.trim_start_matches('0');
                Ok(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Version)
    }
}

// Both sides are digit strings without leading zeros: the longer one is larger,
// equal lengths order lexically.
fn compare_component(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Parses and compares two version strings.
///
/// # Example
///
/// ```
/// use prereq::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.9", "1.10").unwrap(), Ordering::Less);
/// assert!(compare_versions("a.b", "1.0").is_err());
/// ```
pub fn compare_versions(v1: &str, v2: &str) -> Result<Ordering, SetupError> {
    let v1: Version = v1.parse()?;
    let v2: Version = v2.parse()?;
    Ok(v1.compare(&v2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions() {
        assert_eq!(compare_versions("1.2.3", "1.2.3").unwrap(), Ordering::Equal);
    }

    #[test]
    fn numeric_not_lexical() {
        assert_eq!(compare_versions("1.9", "1.10").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("1.10", "1.9").unwrap(), Ordering::Greater);
    }

    #[test]
    fn first_difference_decides() {
        assert_eq!(compare_versions("2.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("3.27.9", "3.28").unwrap(), Ordering::Less);
    }

    #[test]
    fn only_shared_positions_are_compared() {
        assert_eq!(compare_versions("1.2", "1.2.0").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("18", "18.0.0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn rejects_non_numeric_components() {
        for bad in ["a.b", "1..2", "", "1.+2", "1.2-rc1", " 1.2"] {
            let err = compare_versions(bad, "1.0").unwrap_err();
            assert!(matches!(err, SetupError::InvalidVersion(_)), "{bad:?}");
        }
        assert!(compare_versions("1.0", "x").is_err());
    }

    #[test]
    fn satisfies_minimum() {
        let installed: Version = "3.28.1".parse().unwrap();
        assert!(installed.satisfies(&"3.28".parse().unwrap()));
        assert!(!installed.satisfies(&"3.29".parse().unwrap()));
        assert_eq!(installed.to_string(), "3.28.1");
        assert_eq!(installed.components(), &["3", "28", "1"]);
    }

    #[test]
    fn components_beyond_u64_still_compare() {
        let huge = "99999999999999999999.0";
        assert_eq!(compare_versions(huge, "1.0").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("1.0", huge).unwrap(), Ordering::Less);
        assert_eq!(
            compare_versions("1.99999999999999999999", "1.100000000000000000000").unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn leading_zeros_are_ignored() {
        assert_eq!(compare_versions("1.02", "1.2").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("1.00", "1.0").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("1.010", "1.9").unwrap(), Ordering::Greater);
        assert_eq!("007.0".parse::<Version>().unwrap().to_string(), "7.0");
    }
}
