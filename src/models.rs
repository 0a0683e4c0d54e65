//! Canonical chat message shared by the reader and the moderation pipeline.

use serde::{Deserialize, Serialize};

/// One normalized live chat text message.
///
/// `id` is assigned upstream and is only unique within a single stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    /// External channel id of the author
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    /// Upstream timestamp in microseconds, kept as delivered
    pub published_at: String,
    pub is_owner: bool,
    pub is_moderator: bool,
    pub is_member: bool,
}

impl ChatMessage {
    /// Owner or moderator.
    pub fn is_privileged(&self) -> bool {
        self.is_owner || self.is_moderator
    }

    /// Short role marker used when logging incoming chat.
    pub fn role_icon(&self) -> &'static str {
        if self.is_owner {
            "👑"
        } else if self.is_moderator {
            "🛡️"
        } else {
            "👤"
        }
    }
}
