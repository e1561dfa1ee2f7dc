//! Foundational low-level utilities shared across dcon crates.
//!
//! Provides atomic file-write helpers for the bookmark store and automation
//! file, unix clock helpers used for automation dedup tokens, and poison
//! recovering lock accessors.

pub mod atomic_io;
pub mod sync_utils;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use sync_utils::{lock_or_recover, read_or_recover, write_or_recover};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms, current_unix_timestamp_i64};
