use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{Channel, Community, PlatformClient, PlatformError, Role, RoleEdit};

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const COMMUNITY_LIST_LIMIT: &str = "100";

#[derive(Debug, Clone)]
/// Public struct `DiscordConfig` used across dcon components.
pub struct DiscordConfig {
    pub api_base: String,
    pub token: String,
    pub bot: bool,
    pub request_timeout_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            token: String::new(),
            bot: true,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
/// REST adapter implementing [`PlatformClient`] against the Discord HTTP API.
pub struct DiscordHttpClient {
    client: reqwest::Client,
    api_base: String,
}

impl DiscordHttpClient {
    pub fn new(config: DiscordConfig) -> Result<Self, PlatformError> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(PlatformError::MissingToken);
        }
        let api_base = config.api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(PlatformError::InvalidResponse(
                "api base cannot be empty".to_string(),
            ));
        }

        let authorization = if config.bot && !token.starts_with("Bot ") {
            format!("Bot {token}")
        } else {
            token.to_string()
        };
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization).map_err(|e| {
                PlatformError::InvalidResponse(format!("invalid token header: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, api_base })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        tracing::debug!(method = %method, url = %url, "platform request");
        self.client.request(method, url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PlatformError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "platform request failed");
            return Err(PlatformError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), PlatformError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for DiscordHttpClient {
    async fn communities(&self) -> Result<Vec<Community>, PlatformError> {
        self.send_json(
            self.request(Method::GET, "users/@me/guilds")
                .query(&[("limit", COMMUNITY_LIST_LIMIT)]),
        )
        .await
    }

    async fn community(&self, community_id: &str) -> Result<Community, PlatformError> {
        self.send_json(self.request(Method::GET, &format!("guilds/{community_id}")))
            .await
    }

    async fn community_channels(&self, community_id: &str) -> Result<Vec<Channel>, PlatformError> {
        self.send_json(self.request(Method::GET, &format!("guilds/{community_id}/channels")))
            .await
    }

    async fn channel(&self, channel_id: &str) -> Result<Channel, PlatformError> {
        self.send_json(self.request(Method::GET, &format!("channels/{channel_id}")))
            .await
    }

    async fn private_channels(&self) -> Result<Vec<Channel>, PlatformError> {
        self.send_json(self.request(Method::GET, "users/@me/channels"))
            .await
    }

    async fn create_dm_channel(&self, user_id: &str) -> Result<Channel, PlatformError> {
        self.send_json(
            self.request(Method::POST, "users/@me/channels")
                .json(&json!({ "recipient_id": user_id })),
        )
        .await
    }

    async fn community_roles(&self, community_id: &str) -> Result<Vec<Role>, PlatformError> {
        self.send_json(self.request(Method::GET, &format!("guilds/{community_id}/roles")))
            .await
    }

    async fn create_role(&self, community_id: &str) -> Result<Role, PlatformError> {
        self.send_json(
            self.request(Method::POST, &format!("guilds/{community_id}/roles"))
                .json(&json!({})),
        )
        .await
    }

    async fn edit_role(
        &self,
        community_id: &str,
        role_id: &str,
        edit: &RoleEdit,
    ) -> Result<Role, PlatformError> {
        self.send_json(
            self.request(
                Method::PATCH,
                &format!("guilds/{community_id}/roles/{role_id}"),
            )
            .json(edit),
        )
        .await
    }

    async fn delete_role(&self, community_id: &str, role_id: &str) -> Result<(), PlatformError> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("guilds/{community_id}/roles/{role_id}"),
        ))
        .await
    }

    async fn add_member_role(
        &self,
        community_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.send_empty(self.request(
            Method::PUT,
            &format!("guilds/{community_id}/members/{user_id}/roles/{role_id}"),
        ))
        .await
    }

    async fn remove_member_role(
        &self,
        community_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("guilds/{community_id}/members/{user_id}/roles/{role_id}"),
        ))
        .await
    }
}
