// ABOUTME: Release directory management.
// ABOUTME: Enumerates, creates, and deletes timestamp-named release directories.

mod error;
mod set;
mod store;

pub use error::StoreError;
pub use set::{Release, ReleaseSet};
pub use store::ReleaseStore;
