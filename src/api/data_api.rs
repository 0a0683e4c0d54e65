//! YouTube Data API v3 adapter: stream discovery and authenticated chat writes.
//!
//! Reading chat never goes through here (that is the quota-free InnerTube
//! reader). The access token is obtained and refreshed elsewhere.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::innertube::REQUEST_TIMEOUT;
use crate::api::publisher::{preview, PublishError};
use crate::traits::{BroadcastInfo, ChatPublisher, StreamResolver};

const DATA_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Data API returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("No active live broadcast found on channel '{0}'. Make sure the channel is live, or set video_id.")]
    NoActiveBroadcast(String),
    #[error("Video '{0}' is not currently live or has no active chat")]
    NoActiveChat(String),
    #[error("Could not detect your channel. Set channel_id in the config.")]
    ChannelUnknown,
    #[error("Data API credentials are not configured")]
    MissingCredentials,
}

/// Thin Data API client. `api_key` covers public reads; `access_token` is
/// required for writes and for `mine=true` lookups.
#[derive(Debug, Clone)]
pub struct DataApiClient {
    api_key: Option<String>,
    access_token: Option<String>,
    base_url: String,
    http_client: reqwest::Client,
}

impl DataApiClient {
    pub fn new(api_key: Option<String>, access_token: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            access_token: access_token.filter(|t| !t.is_empty()),
            base_url: DATA_API_BASE_URL.to_string(),
            http_client,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn can_read(&self) -> bool {
        self.api_key.is_some() || self.access_token.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.access_token.is_some()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.access_token, &self.api_key) {
            (Some(token), _) => request.bearer_auth(token),
            (None, Some(key)) => request.query(&[("key", key.as_str())]),
            (None, None) => request,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ResolveError> {
        if !self.can_read() {
            return Err(ResolveError::MissingCredentials);
        }

        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("📡 Data API request: {}", path);

        let response = self
            .authorize(self.http_client.get(&url).query(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("⚠️ Data API {} returned {}", path, status);
            return Err(ResolveError::Status(status));
        }
        Ok(response.json().await?)
    }

    async fn insert_chat_message(&self, snippet: Value) -> Result<(), PublishError> {
        let Some(token) = &self.access_token else {
            return Err(PublishError::PermissionDenied(
                "no access token configured".to_string(),
            ));
        };

        let response = self
            .http_client
            .post(format!("{}/liveChat/messages", self.base_url))
            .query(&[("part", "snippet")])
            .bearer_auth(token)
            .json(&json!({ "snippet": snippet }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::FORBIDDEN {
            Err(PublishError::PermissionDenied(body))
        } else {
            Err(PublishError::Status { status, body })
        }
    }
}

fn first_item(value: &Value) -> Option<&Value> {
    value.get("items")?.as_array()?.first()
}

#[async_trait]
impl StreamResolver for DataApiClient {
    async fn find_active_broadcast(
        &self,
        channel_id: Option<&str>,
    ) -> Result<BroadcastInfo, ResolveError> {
        let channel_id = match channel_id.filter(|c| !c.is_empty()) {
            Some(id) => id.to_string(),
            None => self.bot_channel().await.ok_or(ResolveError::ChannelUnknown)?,
        };

        tracing::info!(
            "🔍 Searching for live stream on channel: {}...",
            channel_id.chars().take(15).collect::<String>()
        );

        let response = self
            .get_json(
                "search",
                &[
                    ("part", "id,snippet"),
                    ("channelId", channel_id.as_str()),
                    ("eventType", "live"),
                    ("type", "video"),
                    ("maxResults", "1"),
                ],
            )
            .await?;

        let item = first_item(&response)
            .ok_or_else(|| ResolveError::NoActiveBroadcast(channel_id.clone()))?;
        let video_id = item
            .pointer("/id/videoId")
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::NoActiveBroadcast(channel_id.clone()))?;
        let title = item
            .pointer("/snippet/title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled Stream");

        tracing::info!("📡 Auto-detected live broadcast: \"{}\"", title);
        Ok(BroadcastInfo {
            video_id: video_id.to_string(),
            title: title.to_string(),
        })
    }

    async fn live_chat_id(&self, video_id: &str) -> Result<String, ResolveError> {
        let response = self
            .get_json(
                "videos",
                &[("part", "liveStreamingDetails"), ("id", video_id)],
            )
            .await?;

        let chat_id = first_item(&response)
            .and_then(|item| item.pointer("/liveStreamingDetails/activeLiveChatId"))
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::NoActiveChat(video_id.to_string()))?;

        tracing::info!(
            "🔗 Live chat id: {}...",
            chat_id.chars().take(20).collect::<String>()
        );
        Ok(chat_id.to_string())
    }

    async fn stream_owner(&self, video_id: &str) -> Option<String> {
        match self
            .get_json("videos", &[("part", "snippet"), ("id", video_id)])
            .await
        {
            Ok(response) => {
                let owner = first_item(&response)
                    .and_then(|item| item.pointer("/snippet/channelId"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(owner) = &owner {
                    tracing::info!(
                        "👑 Stream owner channel: {}...",
                        owner.chars().take(15).collect::<String>()
                    );
                }
                owner
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not detect stream owner: {}", e);
                None
            }
        }
    }

    async fn bot_channel(&self) -> Option<String> {
        if self.access_token.is_none() {
            return None;
        }

        match self.get_json("channels", &[("part", "id"), ("mine", "true")]).await {
            Ok(response) => first_item(&response)
                .and_then(|item| item.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                tracing::warn!("⚠️ Could not detect bot channel: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ChatPublisher for DataApiClient {
    async fn publish(&self, chat_handle: &str, text: &str) -> Result<(), PublishError> {
        let result = self
            .insert_chat_message(json!({
                "liveChatId": chat_handle,
                "type": "textMessageEvent",
                "textMessageDetails": { "messageText": text },
            }))
            .await;

        match &result {
            Ok(()) => tracing::info!("💬 Sent: {}", preview(text)),
            Err(PublishError::PermissionDenied(_)) => {
                tracing::warn!("⚠️ Cannot send message (quota/permissions)")
            }
            Err(e) => tracing::error!("❌ Failed to send message: {}", e),
        }
        result
    }

    async fn publish_poll(
        &self,
        chat_handle: &str,
        question: &str,
        options: &[String],
    ) -> Result<(), PublishError> {
        let option_items: Vec<Value> = options
            .iter()
            .map(|opt| json!({ "optionText": opt }))
            .collect();

        let result = self
            .insert_chat_message(json!({
                "liveChatId": chat_handle,
                "type": "pollEvent",
                "pollDetails": {
                    "metadata": {
                        "questionText": question,
                        "options": option_items,
                    },
                    "status": "active",
                },
                "textMessageDetails": { "messageText": question },
            }))
            .await;

        match &result {
            Ok(()) => tracing::info!(
                "📊 Poll created: '{}' with {} options",
                question,
                options.len()
            ),
            Err(PublishError::PermissionDenied(_)) => {
                tracing::warn!("⚠️ Cannot create poll. Only the stream owner can create polls.")
            }
            Err(e) => tracing::error!("❌ Failed to create poll: {}", e),
        }
        result
    }
}
