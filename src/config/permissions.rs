// ABOUTME: chown/chmod fix-up rules, one per phase around the symlink switch.
// ABOUTME: Paths are relative to the release the rule is applied to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::types::{GroupName, Permission};

/// When a permission rule runs relative to the `current` switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionPhase {
    Pre,
    Post,
}

impl fmt::Display for PermissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionPhase::Pre => write!(f, "pre-switch"),
            PermissionPhase::Post => write!(f, "post-switch"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChownRule {
    #[serde(default)]
    pub group: Option<GroupName>,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl ChownRule {
    /// Group and paths are both set.
    pub fn is_active(&self) -> bool {
        self.group.is_some() && !self.paths.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChmodRule {
    #[serde(default)]
    pub permission: Option<Permission>,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl ChmodRule {
    /// Permission and paths are both set.
    pub fn is_active(&self) -> bool {
        self.permission.is_some() && !self.paths.is_empty()
    }
}

/// A pair of rules keyed `Pre` and `Post`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Phased<T> {
    #[serde(default)]
    pub pre: T,
    #[serde(default)]
    pub post: T,
}

impl<T> Phased<T> {
    pub fn get(&self, phase: PermissionPhase) -> &T {
        match phase {
            PermissionPhase::Pre => &self.pre,
            PermissionPhase::Post => &self.post,
        }
    }

    pub fn get_mut(&mut self, phase: PermissionPhase) -> &mut T {
        match phase {
            PermissionPhase::Pre => &mut self.pre,
            PermissionPhase::Post => &mut self.post,
        }
    }
}
