use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Top-level group container (a "guild" on the wire).
pub struct Community {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `User` used across dcon components.
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
/// Channel discriminator, encoded as the platform's numeric channel type.
pub enum ChannelKind {
    Text,
    DirectMessage,
    Voice,
    GroupDirectMessage,
    Category,
    Announcement,
    Other(u8),
}

impl ChannelKind {
    pub fn is_private(self) -> bool {
        matches!(self, Self::DirectMessage | Self::GroupDirectMessage)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::DirectMessage => "dm",
            Self::Voice => "voice",
            Self::GroupDirectMessage => "group",
            Self::Category => "category",
            Self::Announcement => "announcement",
            Self::Other(_) => "other",
        }
    }
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Text,
            1 => Self::DirectMessage,
            2 => Self::Voice,
            3 => Self::GroupDirectMessage,
            4 => Self::Category,
            5 => Self::Announcement,
            other => Self::Other(other),
        }
    }
}

impl From<ChannelKind> for u8 {
    fn from(value: ChannelKind) -> Self {
        match value {
            ChannelKind::Text => 0,
            ChannelKind::DirectMessage => 1,
            ChannelKind::Voice => 2,
            ChannelKind::GroupDirectMessage => 3,
            ChannelKind::Category => 4,
            ChannelKind::Announcement => 5,
            ChannelKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Conversation stream inside a community, or a private channel with no parent.
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub position: i64,
    #[serde(rename = "guild_id", default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<User>,
}

impl Channel {
    pub fn is_private(&self) -> bool {
        self.kind.is_private()
    }

    /// Comma-joined recipient usernames; empty when the first recipient has no
    /// usable name.
    pub fn recipient_names(&self) -> String {
        match self.recipients.first() {
            Some(first) if first.username.chars().count() > 1 => self
                .recipients
                .iter()
                .map(|user| user.username.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `Role` used across dcon components.
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_permissions")]
    pub permissions: i64,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub mentionable: bool,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Full replacement payload for a role edit.
pub struct RoleEdit {
    pub name: String,
    pub color: u32,
    pub hoist: bool,
    #[serde(serialize_with = "serialize_permissions")]
    pub permissions: i64,
    pub mentionable: bool,
}

impl From<&Role> for RoleEdit {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            color: role.color,
            hoist: role.hoist,
            permissions: role.permissions,
            mentionable: role.mentionable,
        }
    }
}

// Permission bitsets arrive as decimal strings on current API versions and as
// integers on older ones.
fn deserialize_permissions<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPermissions {
        Number(i64),
        Text(String),
    }

    match RawPermissions::deserialize(deserializer)? {
        RawPermissions::Number(value) => Ok(value),
        RawPermissions::Text(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|error| serde::de::Error::custom(format!("invalid permissions: {error}"))),
    }
}

fn serialize_permissions<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

#[derive(Debug, Error)]
/// Enumerates supported `PlatformError` values.
pub enum PlatformError {
    #[error("missing account token")]
    MissingToken,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("platform returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
/// Authenticated access to the remote chat platform.
pub trait PlatformClient: Send + Sync {
    async fn communities(&self) -> Result<Vec<Community>, PlatformError>;

    async fn community(&self, community_id: &str) -> Result<Community, PlatformError>;

    async fn community_channels(&self, community_id: &str) -> Result<Vec<Channel>, PlatformError>;

    async fn channel(&self, channel_id: &str) -> Result<Channel, PlatformError>;

    async fn private_channels(&self) -> Result<Vec<Channel>, PlatformError>;

    async fn create_dm_channel(&self, user_id: &str) -> Result<Channel, PlatformError>;

    async fn community_roles(&self, community_id: &str) -> Result<Vec<Role>, PlatformError>;

    async fn create_role(&self, community_id: &str) -> Result<Role, PlatformError>;

    async fn edit_role(
        &self,
        community_id: &str,
        role_id: &str,
        edit: &RoleEdit,
    ) -> Result<Role, PlatformError>;

    async fn delete_role(&self, community_id: &str, role_id: &str) -> Result<(), PlatformError>;

    async fn add_member_role(
        &self,
        community_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_member_role(
        &self,
        community_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;
}
