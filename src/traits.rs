//! Seams between the moderation loop and the outside world.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::innertube::ConnectionError;
use crate::api::publisher::PublishError;
use crate::models::ChatMessage;

/// One poll result: fresh messages in delivery order and the wait before the next poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PollBatch {
    pub messages: Vec<ChatMessage>,
    pub wait: Duration,
    /// Set when the exchange itself failed and the batch is a stand-in.
    pub degraded: bool,
}

impl PollBatch {
    pub fn new(messages: Vec<ChatMessage>, wait: Duration) -> Self {
        Self {
            messages,
            wait,
            degraded: false,
        }
    }

    pub fn empty(wait: Duration) -> Self {
        Self::new(Vec::new(), wait)
    }

    /// Empty stand-in for an exchange that did not complete.
    pub fn degraded(wait: Duration) -> Self {
        Self {
            degraded: true,
            ..Self::empty(wait)
        }
    }
}

/// Source of live chat messages.
#[async_trait]
pub trait ChatSource: Send {
    /// Establish the initial polling handle.
    async fn connect(&mut self) -> Result<(), ConnectionError>;

    /// Fetch the next batch. Implementations that can degrade should return a
    /// [`PollBatch::degraded()`] batch instead of an error; an `Err` triggers the
    /// loop's backoff.
    async fn poll(&mut self) -> anyhow::Result<PollBatch>;

    /// Release the transport.
    async fn close(&mut self);
}

/// Write side of the chat: sending replies and creating polls.
#[async_trait]
pub trait ChatPublisher: Send + Sync {
    async fn publish(&self, chat_handle: &str, text: &str) -> Result<(), PublishError>;

    async fn publish_poll(
        &self,
        chat_handle: &str,
        question: &str,
        options: &[String],
    ) -> Result<(), PublishError>;
}

/// A live broadcast found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastInfo {
    pub video_id: String,
    pub title: String,
}

/// Metadata lookups used while resolving which stream to moderate.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Active broadcast on `channel_id`, or on the authenticated channel when `None`.
    async fn find_active_broadcast(
        &self,
        channel_id: Option<&str>,
    ) -> Result<BroadcastInfo, crate::api::data_api::ResolveError>;

    /// Chat handle (active live chat id) for a video.
    async fn live_chat_id(&self, video_id: &str)
        -> Result<String, crate::api::data_api::ResolveError>;

    /// Channel id of the stream owner, best effort.
    async fn stream_owner(&self, video_id: &str) -> Option<String>;

    /// Channel id the bot posts as, best effort.
    async fn bot_channel(&self) -> Option<String>;
}
