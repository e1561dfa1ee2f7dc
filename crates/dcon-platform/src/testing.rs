//! Scripted [`PlatformClient`] double shared by the crates that sit on top of
//! the platform seam. Enabled for their tests through the `test-support`
//! feature.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dcon_core::lock_or_recover;

use crate::{Channel, ChannelKind, Community, PlatformClient, PlatformError, Role, RoleEdit};

pub fn community(id: &str, name: &str) -> Community {
    Community {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn channel(
    id: &str,
    name: &str,
    kind: ChannelKind,
    position: i64,
    community_id: Option<&str>,
) -> Channel {
    Channel {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        position,
        community_id: community_id.map(str::to_string),
        recipients: Vec::new(),
    }
}

pub fn role(id: &str, name: &str, position: i64) -> Role {
    Role {
        id: id.to_string(),
        name: name.to_string(),
        permissions: 0,
        color: 0,
        hoist: false,
        mentionable: false,
        position,
    }
}

#[derive(Default)]
struct Recorded {
    calls: Vec<String>,
    role_edits: Vec<(String, RoleEdit)>,
}

/// In-memory platform with fixed communities, channels and roles that records
/// every call it serves.
#[derive(Default)]
pub struct ScriptedPlatformClient {
    communities: Vec<Community>,
    channels: BTreeMap<String, Vec<Channel>>,
    private: Vec<Channel>,
    roles: BTreeMap<String, Vec<Role>>,
    recorded: Mutex<Recorded>,
}

impl ScriptedPlatformClient {
    pub fn with_community(mut self, community: Community, channels: Vec<Channel>) -> Self {
        self.channels.insert(community.id.clone(), channels);
        self.communities.push(community);
        self
    }

    pub fn with_private(mut self, channel: Channel) -> Self {
        self.private.push(channel);
        self
    }

    pub fn with_roles(mut self, community_id: &str, roles: Vec<Role>) -> Self {
        self.roles.insert(community_id.to_string(), roles);
        self
    }

    pub fn call_count(&self, name: &str) -> usize {
        lock_or_recover(&self.recorded)
            .calls
            .iter()
            .filter(|call| call.as_str() == name)
            .count()
    }

    pub fn role_edits(&self) -> Vec<(String, RoleEdit)> {
        lock_or_recover(&self.recorded).role_edits.clone()
    }

    fn record(&self, name: &str) {
        lock_or_recover(&self.recorded).calls.push(name.to_string());
    }

    fn not_found(what: &str, id: &str) -> PlatformError {
        PlatformError::HttpStatus {
            status: 404,
            body: format!("unknown {what} {id}"),
        }
    }
}

#[async_trait]
impl PlatformClient for ScriptedPlatformClient {
    async fn communities(&self) -> Result<Vec<Community>, PlatformError> {
        self.record("communities");
        Ok(self.communities.clone())
    }

    async fn community(&self, community_id: &str) -> Result<Community, PlatformError> {
        self.record("community");
        self.communities
            .iter()
            .find(|community| community.id == community_id)
            .cloned()
            .ok_or_else(|| Self::not_found("community", community_id))
    }

    async fn community_channels(&self, community_id: &str) -> Result<Vec<Channel>, PlatformError> {
        self.record("community_channels");
        self.channels
            .get(community_id)
            .cloned()
            .ok_or_else(|| Self::not_found("community", community_id))
    }

    async fn channel(&self, channel_id: &str) -> Result<Channel, PlatformError> {
        self.record("channel");
        self.channels
            .values()
            .flatten()
            .chain(self.private.iter())
            .find(|channel| channel.id == channel_id)
            .cloned()
            .ok_or_else(|| Self::not_found("channel", channel_id))
    }

    async fn private_channels(&self) -> Result<Vec<Channel>, PlatformError> {
        self.record("private_channels");
        Ok(self.private.clone())
    }

    async fn create_dm_channel(&self, user_id: &str) -> Result<Channel, PlatformError> {
        self.record("create_dm_channel");
        Ok(channel(
            &format!("dm-{user_id}"),
            "",
            ChannelKind::DirectMessage,
            0,
            None,
        ))
    }

    async fn community_roles(&self, community_id: &str) -> Result<Vec<Role>, PlatformError> {
        self.record("community_roles");
        Ok(self.roles.get(community_id).cloned().unwrap_or_default())
    }

    async fn create_role(&self, _community_id: &str) -> Result<Role, PlatformError> {
        self.record("create_role");
        Ok(role("new-role", "new role", 0))
    }

    async fn edit_role(
        &self,
        _community_id: &str,
        role_id: &str,
        edit: &RoleEdit,
    ) -> Result<Role, PlatformError> {
        self.record("edit_role");
        lock_or_recover(&self.recorded)
            .role_edits
            .push((role_id.to_string(), edit.clone()));
        Ok(Role {
            name: edit.name.clone(),
            ..role(role_id, "", 0)
        })
    }

    async fn delete_role(&self, _community_id: &str, _role_id: &str) -> Result<(), PlatformError> {
        self.record("delete_role");
        Ok(())
    }

    async fn add_member_role(
        &self,
        _community_id: &str,
        _user_id: &str,
        _role_id: &str,
    ) -> Result<(), PlatformError> {
        self.record("add_member_role");
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _community_id: &str,
        _user_id: &str,
        _role_id: &str,
    ) -> Result<(), PlatformError> {
        self.record("remove_member_role");
        Ok(())
    }
}
