//! Dotted version keys for exportable record schemas.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MigrationError, Result};

/// An ordered sequence of non-negative integer segments, e.g. "1.4.2".
///
/// Version keys are immutable once constructed. Keys are only comparable
/// when they have the same segment count; comparing keys of different
/// arity is a checked integrity error, never a silent truncation. All
/// keys within one index share the same arity, which the index verifies
/// at load time before sorting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey {
    segments: Vec<u64>,
}

impl VersionKey {
    /// Parses a dotted version string such as `"1.0.0"`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedVersion` if the string is empty or any segment
    /// is not a plain non-negative integer (signs and empty segments are
    /// rejected).
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(MigrationError::malformed_version(s));
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            // `u64::from_str` accepts a leading '+', which is not a
            // valid version segment; require plain digits.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(MigrationError::malformed_version(s));
            }
            let segment = part
                .parse::<u64>()
                .map_err(|_| MigrationError::malformed_version(s))?;
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// Returns the number of segments in this key.
    pub fn arity(&self) -> usize {
        self.segments.len()
    }

    /// Returns the raw segments, most significant first.
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Segment-wise numeric comparison from the most significant segment.
    ///
    /// # Errors
    ///
    /// Returns `IncomparableVersions` if the two keys differ in segment
    /// count. All versions within one index share arity by contract;
    /// a mismatch is surfaced rather than truncated.
    pub fn compare(&self, other: &VersionKey) -> Result<Ordering> {
        if self.segments.len() != other.segments.len() {
            return Err(MigrationError::incomparable(self, other));
        }
        Ok(self.segments.cmp(&other.segments))
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", rendered)
    }
}

impl Serialize for VersionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VersionKey::parse(&s).map_err(serde::de::Error::custom)
    }
}
