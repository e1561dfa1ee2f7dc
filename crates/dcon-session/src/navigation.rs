use std::sync::Mutex;

use anyhow::{bail, Result};
use dcon_core::lock_or_recover;
use dcon_platform::{Channel, Community};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Where the session currently is.
///
/// `channel` is only `None` for the home location the stack is seeded with;
/// every pushed location carries a channel.
pub struct Location {
    pub community: Option<Community>,
    pub channel: Option<Channel>,
}

impl Location {
    pub fn home() -> Self {
        Self::default()
    }

    pub fn new(community: Option<Community>, channel: Channel) -> Self {
        Self {
            community,
            channel: Some(channel),
        }
    }

    pub fn community_id(&self) -> Option<&str> {
        self.community.as_ref().map(|community| community.id.as_str())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel.as_ref().map(|channel| channel.id.as_str())
    }

    /// One-line rendering used by the prompt and the `location` command.
    pub fn describe(&self) -> String {
        let community = self
            .community
            .as_ref()
            .map_or("none", |community| community.name.as_str());
        match &self.channel {
            Some(channel) if channel.is_private() => {
                format!("community={community} channel={} (private)", channel.id)
            }
            Some(channel) => format!("community={community} channel=#{}", channel.name),
            None => format!("community={community} channel=none"),
        }
    }
}

/// Append-only stack of visited locations; the top is the current location.
#[derive(Debug)]
pub struct NavigationContext {
    stack: Mutex<Vec<Location>>,
}

impl Default for NavigationContext {
    fn default() -> Self {
        Self::new(Location::home())
    }
}

impl NavigationContext {
    pub fn new(seed: Location) -> Self {
        Self {
            stack: Mutex::new(vec![seed]),
        }
    }

    /// Pushes `channel` (under `community`) and makes it current.
    ///
    /// Callers resolve the owning community before pushing a community channel;
    /// private channels push with `community = None`.
    pub fn push(&self, community: Option<Community>, channel: Channel) -> Result<()> {
        if !channel.is_private() {
            if let (Some(community), Some(parent_id)) = (&community, &channel.community_id) {
                if community.id != *parent_id {
                    bail!(
                        "channel {} belongs to community {} but community {} was supplied",
                        channel.id,
                        parent_id,
                        community.id
                    );
                }
            }
        }
        let mut stack = lock_or_recover(&self.stack);
        stack.push(Location::new(community, channel));
        tracing::debug!(depth = stack.len(), "navigation push");
        Ok(())
    }

    pub fn current(&self) -> Location {
        lock_or_recover(&self.stack)
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        lock_or_recover(&self.stack).len()
    }
}
