// ABOUTME: Unix group name validation for chown fix-ups.
// ABOUTME: Restricts names to the portable character set so they are shell-safe.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupNameError {
    #[error("group name cannot be empty")]
    Empty,

    #[error("group name exceeds maximum length of 32 characters")]
    TooLong,

    #[error("group name must start with a lowercase letter or underscore")]
    InvalidStart,

    #[error("invalid character in group name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(value: &str) -> Result<Self, GroupNameError> {
        if value.is_empty() {
            return Err(GroupNameError::Empty);
        }

        if value.len() > 32 {
            return Err(GroupNameError::TooLong);
        }

        let mut chars = value.chars();
        if let Some(first) = chars.next()
            && !(first.is_ascii_lowercase() || first == '_')
        {
            return Err(GroupNameError::InvalidStart);
        }

        // Samba machine accounts end in '$'.
        let rest = chars.as_str();
        let rest = rest.strip_suffix('$').unwrap_or(rest);

        for c in rest.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '_' && c != '-' {
                return Err(GroupNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for GroupName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GroupName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GroupName::new(&s).map_err(serde::de::Error::custom)
    }
}
