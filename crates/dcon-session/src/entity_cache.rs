use std::sync::{Arc, RwLock};

use dcon_core::{read_or_recover, write_or_recover};
use dcon_platform::{Channel, ChannelKind, Community, PlatformClient, PlatformError};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Single-entry cache value: the items of one fetch plus the tag it was fetched for.
pub struct CacheSlot<T, Tag> {
    pub items: Vec<T>,
    pub tag: Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `ChannelSlotTag` used across dcon components.
pub struct ChannelSlotTag {
    pub community_id: String,
    pub kind: ChannelKind,
}

type Slot<T, Tag> = RwLock<Option<Arc<CacheSlot<T, Tag>>>>;

/// Last-fetched community and channel listings.
///
/// Each slot holds an `Arc` snapshot; a refetch builds the complete new value
/// before swapping it in under the write lock, so readers see either the old
/// slot or the new one in full. Locks are never held across `.await`.
pub struct EntityCache {
    client: Arc<dyn PlatformClient>,
    communities: Slot<Community, ()>,
    channels: Slot<Channel, ChannelSlotTag>,
}

impl EntityCache {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self {
            client,
            communities: RwLock::new(None),
            channels: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &Arc<dyn PlatformClient> {
        &self.client
    }

    pub async fn communities(&self) -> Result<Arc<CacheSlot<Community, ()>>, PlatformError> {
        if let Some(slot) = read_or_recover(&self.communities).clone() {
            return Ok(slot);
        }

        let items = self.client.communities().await?;
        let slot = Arc::new(CacheSlot { items, tag: () });
        *write_or_recover(&self.communities) = Some(Arc::clone(&slot));
        tracing::debug!(count = slot.items.len(), "community cache refreshed");
        Ok(slot)
    }

    /// Channels of `kind` in `community_id`, sorted by display position.
    ///
    /// A hit requires both the community and the kind to match the stored tag;
    /// anything else refetches and replaces the slot.
    pub async fn channels(
        &self,
        community_id: &str,
        kind: ChannelKind,
    ) -> Result<Arc<CacheSlot<Channel, ChannelSlotTag>>, PlatformError> {
        let tag = ChannelSlotTag {
            community_id: community_id.to_string(),
            kind,
        };
        if let Some(slot) = read_or_recover(&self.channels).clone() {
            if slot.tag == tag {
                return Ok(slot);
            }
        }

        let mut items = self
            .client
            .community_channels(community_id)
            .await?
            .into_iter()
            .filter(|channel| channel.kind == kind)
            .collect::<Vec<_>>();
        items.sort_by_key(|channel| channel.position);

        let slot = Arc::new(CacheSlot { items, tag });
        *write_or_recover(&self.channels) = Some(Arc::clone(&slot));
        tracing::debug!(
            community_id,
            kind = kind.as_str(),
            count = slot.items.len(),
            "channel cache refreshed"
        );
        Ok(slot)
    }

    pub fn cached_communities(&self) -> Vec<Community> {
        read_or_recover(&self.communities)
            .as_ref()
            .map(|slot| slot.items.clone())
            .unwrap_or_default()
    }

    pub fn cached_channels(&self) -> Vec<Channel> {
        read_or_recover(&self.channels)
            .as_ref()
            .map(|slot| slot.items.clone())
            .unwrap_or_default()
    }

    pub fn invalidate(&self) {
        *write_or_recover(&self.communities) = None;
        *write_or_recover(&self.channels) = None;
    }
}
