//! Kernel version normalization and ordering.
//!
//! Versions use the canonical `vMAJOR[.MINOR[.PATCH]][-PRERELEASE][+BUILD]`
//! form. Missing trailing components compare as zero, so `5.3` and `5.3.0`
//! are equal. Shorthand forms may not carry a prerelease or build suffix.
//! Build metadata is ignored when comparing.

use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A version string that could not be interpreted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid version '{input}': {reason}")]
pub struct VersionError {
    /// Normalized input.
    pub input: String,
    pub reason: String,
}

/// A validated kernel version.
///
/// Equality follows the ordering, so versions differing only in build
/// metadata are equal.
#[derive(Debug, Clone)]
pub struct KernelVersion {
    canonical: String,
    version: Version,
}

/// Prefixes `version` with `v` unless it already starts with one.
pub fn normalize(version: &str) -> String {
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}

/// Returns `true` if `version` (after normalization) is well formed.
pub fn is_valid(version: &str) -> bool {
    KernelVersion::parse(version).is_ok()
}

/// Compares two version strings.
///
/// Returns `None` when either side is invalid; callers decide the fallback.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    let a = KernelVersion::parse(a).ok()?;
    let b = KernelVersion::parse(b).ok()?;
    Some(a.cmp(&b))
}

impl KernelVersion {
    /// Parses and validates a version string, normalizing it first.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] when the string is not a version.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let canonical = normalize(input);
        let fail = |reason: &str| VersionError {
            input: canonical.clone(),
            reason: reason.to_string(),
        };

        let body = &canonical[1..];
        let core_end = body.find(|c: char| c == '-' || c == '+').unwrap_or(body.len());
        let (core, suffix) = body.split_at(core_end);

        let components = core.split('.').count();
        let padded = match components {
            1 | 2 if !suffix.is_empty() => {
                return Err(fail("shorthand versions cannot carry a suffix"));
            }
            1 => format!("{}.0.0", core),
            2 => format!("{}.0", core),
            3 => body.to_string(),
            _ => return Err(fail("expected at most three numeric components")),
        };

        let version = Version::parse(&padded).map_err(|e| fail(&e.to_string()))?;
        Ok(Self { canonical, version })
    }

    /// The normalized (`v`-prefixed) form of the version.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.version, &other.version);
        a.major
            .cmp(&b.major)
            .then(a.minor.cmp(&b.minor))
            .then(a.patch.cmp(&b.patch))
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl PartialEq for KernelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KernelVersion {}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for KernelVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
