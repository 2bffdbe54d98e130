// ABOUTME: Release directory name validation and timestamp naming.
// ABOUTME: Names order lexicographically, which matches creation order for timestamps.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Format used for newly created release directories.
pub const RELEASE_NAME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error)]
pub enum ReleaseNameError {
    #[error("release name cannot be empty")]
    Empty,

    #[error("release name cannot start with a dot")]
    Hidden,

    #[error("release name cannot contain a path separator")]
    PathSeparator,

    #[error("invalid character in release name: {0:?}")]
    InvalidChar(char),
}

/// Basename of a release directory.
///
/// Ordering is plain string ordering. It reflects creation order only when
/// names come from a monotonically increasing scheme such as
/// [`ReleaseName::from_timestamp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseName(String);

impl ReleaseName {
    pub fn new(value: &str) -> Result<Self, ReleaseNameError> {
        if value.is_empty() {
            return Err(ReleaseNameError::Empty);
        }

        if value.starts_with('.') {
            return Err(ReleaseNameError::Hidden);
        }

        for c in value.chars() {
            if c == '/' {
                return Err(ReleaseNameError::PathSeparator);
            }
            if c.is_whitespace() || c.is_control() {
                return Err(ReleaseNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    /// Name a release after the given instant (`YYYYMMDDHHMMSS`).
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.format(RELEASE_NAME_FORMAT).to_string())
    }

    /// Parse the creation time back out of a timestamp name.
    ///
    /// Returns `None` for names that were not produced by [`ReleaseName::from_timestamp`].
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        chrono::NaiveDateTime::parse_from_str(&self.0, RELEASE_NAME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_names_round_trip() {
        let at = Utc.with_ymd_and_hms(2024, 1, 3, 4, 5, 6).unwrap();
        let name = ReleaseName::from_timestamp(at);
        assert_eq!(name.as_str(), "20240103040506");
        assert_eq!(name.timestamp(), Some(at));
    }

    #[test]
    fn non_timestamp_names_have_no_timestamp() {
        let name = ReleaseName::new("hotfix-1").unwrap();
        assert!(name.timestamp().is_none());
    }

    #[test]
    fn rejects_dot_entries() {
        assert!(matches!(ReleaseName::new(".git"), Err(ReleaseNameError::Hidden)));
        assert!(matches!(ReleaseName::new(".."), Err(ReleaseNameError::Hidden)));
    }

    #[test]
    fn orders_as_strings() {
        let older = ReleaseName::new("20240101000000").unwrap();
        let newer = ReleaseName::new("20240102000000").unwrap();
        assert!(newer > older);
    }
}
