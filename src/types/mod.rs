// ABOUTME: Validated domain types for releases and permission fix-ups.
// ABOUTME: Construction fails for values that would be unsafe on a shell line.

mod group_name;
mod permission;
mod release_name;

pub use group_name::{GroupName, GroupNameError};
pub use permission::{Permission, PermissionError};
pub use release_name::{RELEASE_NAME_FORMAT, ReleaseName, ReleaseNameError};
