//! Client build identifiers and build ranges

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A four-component client build identifier, e.g. `1.12.1.5875`
///
/// Ordering is lexicographic over `(major, minor, patch, build)`, which is
/// the release order of the client line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Build {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl Build {
    pub fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Build {
            major,
            minor,
            patch,
            build,
        }
    }
}

impl FromStr for Build {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(Error::InvalidBuildFormat(s.to_string()));
        }

        let mut components = [0u32; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::InvalidBuildFormat(s.to_string()));
            }
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidBuildFormat(s.to_string()))?;
        }

        Ok(Build::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

/// One entry of a `BUILD` line: an exact build or a closed inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildRange {
    Exact(Build),
    Range { low: Build, high: Build },
}

impl BuildRange {
    /// True if `build` is covered by this entry
    pub fn contains(&self, build: &Build) -> bool {
        match self {
            BuildRange::Exact(b) => b == build,
            BuildRange::Range { low, high } => low <= build && build <= high,
        }
    }

    /// True if two entries cover at least one common build
    pub fn overlaps(&self, other: &BuildRange) -> bool {
        self.low() <= other.high() && other.low() <= self.high()
    }

    fn low(&self) -> Build {
        match self {
            BuildRange::Exact(b) => *b,
            BuildRange::Range { low, .. } => *low,
        }
    }

    fn high(&self) -> Build {
        match self {
            BuildRange::Exact(b) => *b,
            BuildRange::Range { high, .. } => *high,
        }
    }
}

impl FromStr for BuildRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('-') {
            Some((low, high)) => {
                let low: Build = low.trim().parse()?;
                let high: Build = high.trim().parse()?;
                if low > high {
                    return Err(Error::InvalidBuildFormat(s.to_string()));
                }
                Ok(BuildRange::Range { low, high })
            }
            None => Ok(BuildRange::Exact(s.trim().parse()?)),
        }
    }
}

impl fmt::Display for BuildRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildRange::Exact(b) => write!(f, "{}", b),
            BuildRange::Range { low, high } => write!(f, "{}-{}", low, high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parse() {
        let build: Build = "1.12.1.5875".parse().unwrap();
        assert_eq!(build, Build::new(1, 12, 1, 5875));
        assert_eq!(build.to_string(), "1.12.1.5875");
    }

    #[test]
    fn test_build_parse_rejects_malformed() {
        for bad in ["", "1.12.1", "1.12.1.5875.0", "1.a.1.5875", "1.12.1.-5", "1..1.5875"] {
            assert!(bad.parse::<Build>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_build_ordering_is_lexicographic() {
        let ordered = [
            Build::new(0, 5, 3, 3368),
            Build::new(0, 5, 5, 3494),
            Build::new(1, 2, 0, 4000),
            Build::new(1, 12, 1, 5875),
            Build::new(1, 12, 2, 100),
            Build::new(2, 0, 0, 5610),
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert!(Build::new(1, 12, 1, 5875) < Build::new(1, 12, 1, 5876));
    }

    #[test]
    fn test_range_contains() {
        let range: BuildRange = "1.0.0.0-1.99.99.99".parse().unwrap();
        assert!(range.contains(&"1.12.1.5875".parse().unwrap()));
        assert!(range.contains(&"1.0.0.0".parse().unwrap()));
        assert!(range.contains(&"1.99.99.99".parse().unwrap()));
        assert!(!range.contains(&"2.0.0.0".parse().unwrap()));

        let exact: BuildRange = "1.12.1.5875".parse().unwrap();
        assert!(exact.contains(&"1.12.1.5875".parse().unwrap()));
        assert!(!exact.contains(&"1.12.1.5876".parse().unwrap()));
    }

    #[test]
    fn test_range_rejects_inverted() {
        assert!("2.0.0.0-1.0.0.0".parse::<BuildRange>().is_err());
    }

    #[test]
    fn test_range_overlap() {
        let a: BuildRange = "1.0.0.0-1.99.99.99".parse().unwrap();
        let b: BuildRange = "1.12.0.0-2.0.0.0".parse().unwrap();
        let c: BuildRange = "3.0.0.0".parse().unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(c.overlaps(&c));
    }
}
