//! The moderation loop.
//!
//! Resolves which broadcast to watch, connects a [`ChatSource`], seeds the
//! welcome tracker from the first complete batch and then runs every later message
//! through welcome → command → poll → reload.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::api::data_api::ResolveError;
use crate::api::innertube::ConnectionError;
use crate::api::publisher::PublishError;
use crate::api::youtube::VideoId;
use crate::chat_management::{parse_poll_command, CommandRouter, WelcomeTracker};
use crate::models::ChatMessage;
use crate::traits::{ChatPublisher, ChatSource, StreamResolver};

/// Pause after a failed cycle before polling again.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(10);

pub const POLL_USAGE_MESSAGE: &str = "❌ Usage: /poll \"Question?\" \"Option 1\" \"Option 2\"";
pub const POLL_PERMISSION_MESSAGE: &str =
    "⚠️ Only the stream owner or moderators can create polls.";
/// Sent when the platform refuses to create a poll for the bot's account.
pub const POLL_RESTRICTED_MESSAGE: &str = "⚠️ Only the stream owner can create polls.";

#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error("'{0}' is not a valid YouTube video id or URL")]
    InvalidVideo(String),
    #[error("No video_id set and no way to auto-detect a live broadcast (configure api_key or access_token)")]
    NothingToWatch,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Initializing,
    Connecting,
    Seeding,
    Polling,
    ErrorBackoff,
    Stopped,
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BotState::Initializing => "initializing",
            BotState::Connecting => "connecting",
            BotState::Seeding => "seeding",
            BotState::Polling => "polling",
            BotState::ErrorBackoff => "error-backoff",
            BotState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared read-only view of a running loop's state.
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<RwLock<BotState>>);

impl StateHandle {
    fn new() -> Self {
        Self(Arc::new(RwLock::new(BotState::Initializing)))
    }

    pub fn get(&self) -> BotState {
        *self.0.read()
    }

    fn set(&self, new_state: BotState) {
        let mut state = self.0.write();
        let old_state = *state;
        if old_state != new_state {
            tracing::debug!(old_state = %old_state, new_state = %new_state, "🔄 Bot state changed");
            *state = new_state;
        }
    }
}

/// Everything the loop needs to know about the broadcast it moderates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamContext {
    pub video_id: VideoId,
    /// Handle the publisher posts to (the live chat id when known)
    pub chat_handle: String,
    pub title: Option<String>,
    pub bot_channel_id: Option<String>,
    pub owner_channel_id: Option<String>,
}

/// Work out which broadcast to watch.
///
/// An explicit video (id or URL) wins; otherwise the resolver searches
/// `channel_id` (or the authenticated channel) for an active broadcast.
pub async fn resolve_stream(
    explicit_video: Option<&str>,
    channel_id: Option<&str>,
    resolver: Option<&dyn StreamResolver>,
) -> Result<StreamContext, BotError> {
    let explicit_video = explicit_video.map(str::trim).filter(|v| !v.is_empty());

    let (video_id, title) = match (explicit_video, resolver) {
        (Some(raw), _) => {
            let video_id =
                VideoId::parse(raw).ok_or_else(|| BotError::InvalidVideo(raw.to_string()))?;
            tracing::info!("🔍 Using configured video: {}", video_id.0);
            (video_id, None)
        }
        (None, Some(resolver)) => {
            tracing::info!("🔍 No video_id set, auto-detecting active broadcast...");
            let broadcast = resolver.find_active_broadcast(channel_id).await?;
            (VideoId(broadcast.video_id), Some(broadcast.title))
        }
        (None, None) => return Err(BotError::NothingToWatch),
    };

    let Some(resolver) = resolver else {
        return Ok(StreamContext {
            chat_handle: video_id.0.clone(),
            video_id,
            title,
            bot_channel_id: None,
            owner_channel_id: None,
        });
    };

    let chat_handle = resolver.live_chat_id(&video_id.0).await?;
    let bot_channel_id = resolver.bot_channel().await;
    if let Some(id) = &bot_channel_id {
        tracing::info!("🤖 Bot channel: {}...", id.chars().take(15).collect::<String>());
    }
    let owner_channel_id = resolver.stream_owner(&video_id.0).await;

    Ok(StreamContext {
        video_id,
        chat_handle,
        title,
        bot_channel_id,
        owner_channel_id,
    })
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub messages_processed: usize,
    pub welcomes_sent: usize,
    pub replies_sent: usize,
    pub polls_created: usize,
    pub viewers_tracked: usize,
}

pub struct ModeratorBot<S: ChatSource> {
    context: StreamContext,
    source: S,
    publisher: Arc<dyn ChatPublisher>,
    router: CommandRouter,
    welcome: WelcomeTracker,
    state: StateHandle,
    summary: SessionSummary,
}

impl<S: ChatSource> ModeratorBot<S> {
    pub fn new(
        context: StreamContext,
        source: S,
        publisher: Arc<dyn ChatPublisher>,
        router: CommandRouter,
        mut welcome: WelcomeTracker,
    ) -> Self {
        if let Some(id) = &context.bot_channel_id {
            welcome.set_bot_channel_id(id);
        }
        if let Some(id) = &context.owner_channel_id {
            welcome.set_owner_channel_id(id);
        }

        Self {
            context,
            source,
            publisher,
            router,
            welcome,
            state: StateHandle::new(),
            summary: SessionSummary::default(),
        }
    }

    pub fn context(&self) -> &StreamContext {
        &self.context
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Run until `cancel` fires. Only connection failure ends the loop early.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<SessionSummary, BotError> {
        self.state.set(BotState::Connecting);
        if let Err(e) = self.source.connect().await {
            tracing::error!("❌ {}", e);
            self.state.set(BotState::Stopped);
            return Err(e.into());
        }

        self.state.set(BotState::Seeding);
        tracing::info!("🚀 Bot is now live! Monitoring chat...");
        if let Some(title) = &self.context.title {
            tracing::info!("   Stream: {}", title);
        }
        tracing::info!("   Commands: {} triggers", self.router.trigger_count());
        tracing::info!("   Prefix: '{}'", self.router.prefix());
        tracing::info!("   Tracked viewers: {}", self.welcome.welcomed_count());

        let mut seeded = false;
        while !cancel.is_cancelled() {
            match self.source.poll().await {
                Ok(batch) => {
                    if seeded {
                        for msg in &batch.messages {
                            self.process_message(msg).await;
                        }
                    } else if batch.degraded {
                        tracing::debug!("History not received yet, seeding on the next poll");
                    } else {
                        self.welcome.seed_from_history(&batch.messages);
                        seeded = true;
                        self.state.set(BotState::Polling);
                    }
                    sleep_or_cancel(batch.wait, &cancel).await;
                }
                Err(e) => {
                    tracing::error!("❌ Unexpected error in poll loop: {:#}", e);
                    tracing::info!("   Retrying in {} seconds...", ERROR_BACKOFF.as_secs());
                    self.state.set(BotState::ErrorBackoff);
                    sleep_or_cancel(ERROR_BACKOFF, &cancel).await;
                    self.state.set(if seeded {
                        BotState::Polling
                    } else {
                        BotState::Seeding
                    });
                }
            }
        }

        tracing::info!("🛑 Bot shutting down...");
        self.source.close().await;
        self.summary.viewers_tracked = self.welcome.welcomed_count();
        tracing::info!(
            messages = self.summary.messages_processed,
            welcomes = self.summary.welcomes_sent,
            replies = self.summary.replies_sent,
            polls = self.summary.polls_created,
            "   Tracked {} viewer(s) this session.",
            self.summary.viewers_tracked
        );
        self.state.set(BotState::Stopped);
        Ok(self.summary)
    }

    async fn process_message(&mut self, msg: &ChatMessage) {
        self.summary.messages_processed += 1;
        tracing::info!("{} {}: {}", msg.role_icon(), msg.author_name, msg.text);

        // Welcome runs first and never ends processing of the message.
        if self.welcome.is_new(&msg.author_id) {
            let greeting = self.welcome.get_welcome_message(&msg.author_name);
            if self.send(&greeting).await {
                self.summary.welcomes_sent += 1;
            }
            tracing::info!(
                "👋 Welcomed: {} (total: {})",
                msg.author_name,
                self.welcome.welcomed_count()
            );
        }

        if let Some(reply) = self.router.match_text(&msg.text) {
            if self.send(&reply).await {
                self.summary.replies_sent += 1;
            }
            return;
        }

        let text_lower = msg.text.trim().to_lowercase();
        let prefix = self.router.prefix().to_string();

        if text_lower.starts_with(&format!("{}poll", prefix)) {
            self.handle_poll(msg).await;
            return;
        }

        if text_lower == format!("{}reload", prefix) && msg.is_owner {
            self.router.reload();
            let confirmation = format!(
                "✅ Commands reloaded! ({} triggers)",
                self.router.trigger_count()
            );
            self.send(&confirmation).await;
        }
    }

    async fn handle_poll(&mut self, msg: &ChatMessage) {
        if !msg.is_privileged() {
            self.send(POLL_PERMISSION_MESSAGE).await;
            return;
        }

        let Some(poll) = parse_poll_command(&msg.text) else {
            self.send(POLL_USAGE_MESSAGE).await;
            return;
        };

        match self
            .publisher
            .publish_poll(&self.context.chat_handle, &poll.question, &poll.options)
            .await
        {
            Ok(()) => self.summary.polls_created += 1,
            Err(PublishError::PermissionDenied(reason)) => {
                tracing::debug!("Poll refused: {}", reason);
                self.send(POLL_RESTRICTED_MESSAGE).await;
            }
            Err(e) => tracing::debug!("Poll not created: {}", e),
        }
    }

    /// Publish failures are already logged by the publisher and never change loop state.
    async fn send(&self, text: &str) -> bool {
        match self.publisher.publish(&self.context.chat_handle, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Message not sent: {}", e);
                false
            }
        }
    }
}

async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(wait) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BroadcastInfo;
    use async_trait::async_trait;

    struct FakeResolver {
        live: bool,
    }

    #[async_trait]
    impl StreamResolver for FakeResolver {
        async fn find_active_broadcast(
            &self,
            channel_id: Option<&str>,
        ) -> Result<BroadcastInfo, ResolveError> {
            if self.live {
                Ok(BroadcastInfo {
                    video_id: "dQw4w9WgXcQ".to_string(),
                    title: "Friday stream".to_string(),
                })
            } else {
                Err(ResolveError::NoActiveBroadcast(
                    channel_id.unwrap_or("mine").to_string(),
                ))
            }
        }

        async fn live_chat_id(&self, video_id: &str) -> Result<String, ResolveError> {
            Ok(format!("chat-{}", video_id))
        }

        async fn stream_owner(&self, _video_id: &str) -> Option<String> {
            Some("UC_owner".to_string())
        }

        async fn bot_channel(&self) -> Option<String> {
            None
        }
    }

    #[tokio::test]
    async fn test_resolve_explicit_url_without_resolver() {
        let ctx = resolve_stream(Some("https://youtu.be/dQw4w9WgXcQ"), None, None)
            .await
            .unwrap();
        assert_eq!(ctx.video_id.0, "dQw4w9WgXcQ");
        assert_eq!(ctx.chat_handle, "dQw4w9WgXcQ");
        assert!(ctx.owner_channel_id.is_none());
    }

    #[tokio::test]
    async fn test_resolve_discovers_broadcast() {
        let resolver = FakeResolver { live: true };
        let ctx = resolve_stream(None, Some("UC_chan"), Some(&resolver))
            .await
            .unwrap();
        assert_eq!(ctx.video_id.0, "dQw4w9WgXcQ");
        assert_eq!(ctx.chat_handle, "chat-dQw4w9WgXcQ");
        assert_eq!(ctx.title.as_deref(), Some("Friday stream"));
        assert_eq!(ctx.owner_channel_id.as_deref(), Some("UC_owner"));
        assert!(ctx.bot_channel_id.is_none());
    }

    #[tokio::test]
    async fn test_resolve_failures_are_fatal() {
        assert!(matches!(
            resolve_stream(None, None, None).await,
            Err(BotError::NothingToWatch)
        ));
        assert!(matches!(
            resolve_stream(Some("https://example.com/"), None, None).await,
            Err(BotError::InvalidVideo(_))
        ));

        let offline = FakeResolver { live: false };
        assert!(matches!(
            resolve_stream(Some("  "), Some("UC_chan"), Some(&offline)).await,
            Err(BotError::Resolve(ResolveError::NoActiveBroadcast(_)))
        ));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(BotState::ErrorBackoff.to_string(), "error-backoff");
        let handle = StateHandle::new();
        assert_eq!(handle.get(), BotState::Initializing);
        handle.set(BotState::Polling);
        assert_eq!(handle.clone().get(), BotState::Polling);
    }
}
