pub mod get_live_chat;

use std::time::Duration;

use async_trait::async_trait;

use crate::api::innertube::get_live_chat::{
    get_next_continuation, recommended_wait, GetLiveChatResponse, FALLBACK_WAIT,
};
use crate::api::youtube::{
    extract_api_key, extract_client_version, extract_continuation, ApiKey, ClientVersion,
    Continuation, VideoId,
};
use crate::chat_management::dedup::DedupWindow;
use crate::traits::{ChatSource, PollBatch};

const LIVE_CHAT_URL: &str = "https://www.youtube.com/youtubei/v1/live_chat/get_live_chat";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
/// I/O deadline for every exchange with YouTube.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to fetch video page: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Video page returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("Could not find live chat continuation token. Make sure the stream is live and chat is enabled.")]
    ContinuationNotFound,
}

/// Polling state owned by the client.
#[derive(Debug, Clone)]
pub struct PollState {
    /// `None` until connected
    pub handle: Option<Continuation>,
    pub last_interval: Duration,
}

impl Default for PollState {
    fn default() -> Self {
        Self {
            handle: None,
            last_interval: FALLBACK_WAIT,
        }
    }
}

/// Quota-free live chat reader backed by the InnerTube long-poll endpoint.
#[derive(Debug)]
pub struct LiveChatClient {
    video_id: VideoId,
    api_key: Option<ApiKey>,
    client_version: ClientVersion,
    state: PollState,
    dedup: DedupWindow,
    http_client: Option<reqwest::Client>,
    watch_base_url: String,
    live_chat_url: String,
}

impl LiveChatClient {
    pub fn new(video_id: VideoId) -> Self {
        Self {
            video_id,
            api_key: None,
            client_version: ClientVersion::default(),
            state: PollState::default(),
            dedup: DedupWindow::new(),
            http_client: None,
            watch_base_url: "https://www.youtube.com/watch?v=".to_string(),
            live_chat_url: LIVE_CHAT_URL.to_string(),
        }
    }

    /// Point the client at another host, e.g. a local stub server.
    pub fn with_endpoints(mut self, watch_base_url: &str, live_chat_url: &str) -> Self {
        self.watch_base_url = watch_base_url.to_string();
        self.live_chat_url = live_chat_url.to_string();
        self
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.handle.is_some()
    }

    fn http_client(&mut self) -> Result<reqwest::Client, reqwest::Error> {
        if let Some(client) = &self.http_client {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        self.http_client = Some(client.clone());
        Ok(client)
    }

    /// Fetch the watch page and extract the initial continuation handle.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        tracing::info!("🔗 Connecting to live chat (quota-free reader)...");

        let url = format!("{}{}", self.watch_base_url, self.video_id);
        let response = self.http_client()?.get(&url).send().await.map_err(|e| {
            tracing::error!("❌ Failed to fetch URL: {}", e);
            e
        })?;

        let status = response.status();
        tracing::debug!("📄 Received HTTP response with status: {}", status);
        if !status.is_success() {
            return Err(ConnectionError::Status(status));
        }

        let html = response.text().await?;
        tracing::debug!("📄 HTML response length: {} chars", html.len());

        let continuation = extract_continuation(&html).ok_or(ConnectionError::ContinuationNotFound)?;
        tracing::info!(
            "🔄 Extracted continuation token: {}...",
            continuation.0.chars().take(20).collect::<String>()
        );

        self.api_key = extract_api_key(&html);
        if let Some(client_version) = extract_client_version(&html) {
            tracing::debug!("📱 Extracted client_version: {}", client_version);
            self.client_version = client_version;
        }

        self.state.handle = Some(continuation);
        tracing::info!("✅ Live chat reader connected (quota-free mode)");
        Ok(())
    }

    /// One exchange with the long-poll endpoint. Never fails: transport and
    /// decoding problems yield an empty degraded batch and the fallback wait.
    pub async fn poll(&mut self) -> PollBatch {
        let Some(handle) = self.state.handle.clone() else {
            tracing::error!("❌ No continuation token. Call connect() first.");
            return PollBatch::degraded(FALLBACK_WAIT);
        };

        match self.fetch(&handle).await {
            Ok(response) => self.apply_response(&response),
            Err(e) => {
                tracing::warn!("⚠️ Chat reader error: {:#}", e);
                PollBatch::degraded(FALLBACK_WAIT)
            }
        }
    }

    async fn fetch(&mut self, handle: &Continuation) -> anyhow::Result<GetLiveChatResponse> {
        let url = match &self.api_key {
            Some(key) => format!("{}?key={}&prettyPrint=false", self.live_chat_url, key),
            None => self.live_chat_url.clone(),
        };

        let payload = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "WEB",
                    "clientVersion": self.client_version.to_string(),
                }
            },
            "continuation": handle.0,
        });

        let response = self.http_client()?.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("HTTP request failed with status: {}", status));
        }

        let response_text = response.text().await?;
        tracing::debug!("📄 Response text length: {} chars", response_text.len());

        let live_chat_response: GetLiveChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                tracing::debug!(
                    "🔍 Response text preview: {}",
                    response_text.chars().take(200).collect::<String>()
                );
                e
            })?;
        Ok(live_chat_response)
    }

    /// Update the polling state from a decoded response and return the fresh messages.
    pub fn apply_response(&mut self, response: &GetLiveChatResponse) -> PollBatch {
        let raw = response.chat_messages();
        let raw_count = raw.len();
        let messages = self.dedup.filter(raw);

        let wait = match get_next_continuation(response) {
            Some(next) => {
                self.state.handle = Some(next.continuation);
                recommended_wait(next.timeout_ms)
            }
            None => {
                tracing::warn!("⚠️ No continuation token in response, stream may have ended.");
                FALLBACK_WAIT
            }
        };
        self.state.last_interval = wait;

        tracing::debug!(
            raw = raw_count,
            fresh = messages.len(),
            wait_ms = wait.as_millis() as u64,
            "📨 Live chat response processed"
        );

        PollBatch::new(messages, wait)
    }

    /// Drop the transport and forget the handle.
    pub fn close(&mut self) {
        self.http_client = None;
        self.state.handle = None;
        tracing::debug!("🔌 Live chat reader closed");
    }
}

#[async_trait]
impl ChatSource for LiveChatClient {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        LiveChatClient::connect(self).await
    }

    async fn poll(&mut self) -> anyhow::Result<PollBatch> {
        Ok(LiveChatClient::poll(self).await)
    }

    async fn close(&mut self) {
        LiveChatClient::close(self)
    }
}
