// ABOUTME: chmod mode validation (octal or symbolic).
// ABOUTME: Rejects anything that is not a plain mode so it can be passed as one argument.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("permission cannot be empty")]
    Empty,

    #[error("invalid octal permission: {0}")]
    InvalidOctal(String),

    #[error("invalid symbolic permission clause: {0}")]
    InvalidClause(String),
}

/// A mode accepted by `chmod`, e.g. `2775` or `g+rwX,o-w`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission(String);

impl Permission {
    pub fn new(value: &str) -> Result<Self, PermissionError> {
        if value.is_empty() {
            return Err(PermissionError::Empty);
        }

        if value.chars().all(|c| c.is_ascii_digit()) {
            let valid_len = (3..=4).contains(&value.len());
            if !valid_len || value.chars().any(|c| c > '7') {
                return Err(PermissionError::InvalidOctal(value.to_string()));
            }
            return Ok(Self(value.to_string()));
        }

        for clause in value.split(',') {
            if !is_symbolic_clause(clause) {
                return Err(PermissionError::InvalidClause(clause.to_string()));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `[ugoa]*([-+=][rwxXst]*)+`
fn is_symbolic_clause(clause: &str) -> bool {
    let rest = clause.trim_start_matches(['u', 'g', 'o', 'a']);
    if rest.is_empty() {
        return false;
    }

    let mut saw_op = false;
    for c in rest.chars() {
        match c {
            '+' | '-' | '=' => saw_op = true,
            'r' | 'w' | 'x' | 'X' | 's' | 't' if saw_op => {}
            _ => return false,
        }
    }
    saw_op
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Permission::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_octal_modes() {
        assert!(Permission::new("775").is_ok());
        assert!(Permission::new("2775").is_ok());
    }

    #[test]
    fn rejects_bad_octal() {
        assert!(Permission::new("778").is_err());
        assert!(Permission::new("77").is_err());
        assert!(Permission::new("07755").is_err());
    }

    #[test]
    fn accepts_symbolic_modes() {
        for mode in ["g+w", "ug+rwX", "o-w", "a=r", "u+rwx,g+rx,o-rwx", "+x"] {
            assert!(Permission::new(mode).is_ok(), "{mode} should be valid");
        }
    }

    #[test]
    fn rejects_injection() {
        assert!(Permission::new("775; rm -rf /").is_err());
        assert!(Permission::new("g+w $(id)").is_err());
        assert!(Permission::new("g").is_err());
    }
}
