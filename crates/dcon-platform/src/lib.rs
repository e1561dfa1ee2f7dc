//! Platform client contract and records for the dcon console.
//!
//! The console never talks to the network directly: every remote call goes
//! through [`PlatformClient`], which the REST adapter in [`discord`] implements
//! and tests replace with scripted doubles.
mod discord;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod types;

pub use discord::{DiscordConfig, DiscordHttpClient, DEFAULT_DISCORD_API_BASE};
pub use types::{
    Channel, ChannelKind, Community, PlatformClient, PlatformError, Role, RoleEdit, User,
};
