//! Session state shared by interactive and automated command execution.
//!
//! Holds the navigation stack, the single-slot listing caches, and the
//! bookmark store. Every type here is safe to share behind an `Arc` between the
//! foreground command loop and the automation poll task.

mod bookmarks;
mod entity_cache;
mod navigation;

pub use bookmarks::{
    BookmarkCommand, BookmarkError, BookmarkPersistence, BookmarkStore,
    JsonFileBookmarkPersistence, BOOKMARK_FILE_SCHEMA_VERSION, BOOKMARK_REMOVE_MARKER,
};
pub use entity_cache::{CacheSlot, ChannelSlotTag, EntityCache};
pub use navigation::{Location, NavigationContext};
