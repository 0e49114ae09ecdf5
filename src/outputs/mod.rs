//! Output generation for snapshot files.
//!
//! - [`json`]: Writes one category's [`crate::models::Snapshot`] to its fixed
//!   filename under the data directory, overwriting the previous run.

pub mod json;
