//! Update checking against a release feed.
//!
//! Versions are compared as integer tuples (`1.10.0` is newer than `1.9.0`).
//! The check runs once per launch after a short delay and never surfaces
//! errors; at worst the user is simply not prompted.

pub mod feed;
pub mod gate;
pub mod version;

pub use feed::ReleaseFeed;
pub use gate::{check_after_delay, check_for_update, ReleaseDescriptor, UpdateDecision};
pub use version::{is_newer, VersionTuple};
