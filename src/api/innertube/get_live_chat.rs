//! YouTube Live Chat response model for the InnerTube `get_live_chat` endpoint.
//!
//! Only the parts of the response the moderation pipeline consumes are typed.
//! Every other action or renderer falls into an `Unknown` variant, so a
//! structurally incomplete event is skipped instead of failing the whole batch.

use std::time::Duration;

use serde::Deserialize;

use crate::api::youtube::Continuation;
use crate::models::ChatMessage;

/// Wait used when the server does not recommend one.
pub const FALLBACK_WAIT: Duration = Duration::from_secs(5);
/// Lower bound for the server-recommended wait.
pub const MIN_WAIT: Duration = Duration::from_secs(1);

/// Response from the YouTube Live Chat API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetLiveChatResponse {
    /// Absent when the stream has ended or the handle was rejected
    #[serde(rename = "continuationContents", default)]
    pub continuation_contents: Option<ContinuationContents>,
}

/// Container for the live chat continuation data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContinuationContents {
    #[serde(rename = "liveChatContinuation", default)]
    pub live_chat_continuation: LiveChatContinuation,
}

/// Live chat continuation containing actions and tokens for the next request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveChatContinuation {
    /// Array of actions like new messages, deletions, etc.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Candidate handles for the next request
    #[serde(default)]
    pub continuations: Vec<ContinuationData>,
}

/// One entry of the `continuations` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContinuationData {
    /// Live (push-invalidated) handle
    #[serde(rename = "invalidationContinuationData")]
    pub invalidation: Option<ContinuationBlock>,
    /// Timer based handle
    #[serde(rename = "timedContinuationData")]
    pub timed: Option<ContinuationBlock>,
    /// Handle returned after a chat reload
    #[serde(rename = "reloadContinuationData")]
    pub reload: Option<ContinuationBlock>,
}

/// Handle plus the server-recommended delay before using it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContinuationBlock {
    pub continuation: Option<Continuation>,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

impl ContinuationBlock {
    fn handle(&self) -> Option<&Continuation> {
        self.continuation.as_ref().filter(|c| !c.0.is_empty())
    }
}

/// Handle chosen for the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextContinuation {
    pub continuation: Continuation,
    pub timeout_ms: Option<u64>,
}

/// Enum representing different types of actions in the live chat.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Action to add a new chat item
    AddChatItem(AddChatItemActionWrapper),
    /// Ticker, removal, moderation and other actions
    Unknown(serde_json::Value),
}

/// Wrapper for an AddChatItemAction.
#[derive(Debug, Clone, Deserialize)]
pub struct AddChatItemActionWrapper {
    #[serde(rename = "addChatItemAction")]
    pub action: AddChatItemAction,
}

/// Action to add a chat item.
#[derive(Debug, Clone, Deserialize)]
pub struct AddChatItemAction {
    pub item: ChatItem,
}

/// Enum representing different types of chat items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatItem {
    /// Standard text message in chat
    TextMessage {
        #[serde(rename = "liveChatTextMessageRenderer")]
        renderer: LiveChatTextMessageRenderer,
    },
    /// Super Chats, memberships, engagement messages, or an incomplete text message
    Unknown(serde_json::Value),
}

/// Renderer for a standard text message in live chat.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveChatTextMessageRenderer {
    /// Unique identifier for the message
    pub id: String,
    /// Content of the message with text and/or emojis
    pub message: Message,
    #[serde(rename = "authorName")]
    pub author_name: Option<SimpleText>,
    /// Timestamp in microseconds when the message was sent
    #[serde(rename = "timestampUsec", default)]
    pub timestamp_usec: String,
    /// External channel ID of the author
    #[serde(rename = "authorExternalChannelId")]
    pub author_external_channel_id: String,
    /// Badges displayed next to the author's name
    #[serde(rename = "authorBadges", default)]
    pub author_badges: Vec<AuthorBadge>,
}

/// A message containing a sequence of text and/or emoji runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub runs: Vec<MessageRun>,
}

impl Message {
    /// Concatenate all runs, using the emoji id where a run carries no text.
    pub fn to_plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|run| match (&run.text, &run.emoji) {
                (Some(text), _) => text.as_str(),
                (None, Some(emoji)) => emoji.emoji_id.as_str(),
                (None, None) => "",
            })
            .collect()
    }
}

/// A fragment of a message, containing either text or an emoji.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRun {
    pub text: Option<String>,
    pub emoji: Option<Emoji>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Emoji {
    #[serde(rename = "emojiId", default)]
    pub emoji_id: String,
}

/// Simple text container with plain text content.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleText {
    #[serde(rename = "simpleText")]
    pub simple_text: String,
}

/// Badge displayed next to an author's name.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorBadge {
    #[serde(rename = "liveChatAuthorBadgeRenderer", default)]
    pub renderer: LiveChatAuthorBadgeRenderer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveChatAuthorBadgeRenderer {
    pub icon: Option<Icon>,
    /// Channel-specific image, used by membership badges
    #[serde(rename = "customThumbnail")]
    pub custom_thumbnail: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Icon {
    #[serde(rename = "iconType")]
    pub icon_type: String,
}

/// Roles the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    Owner,
    Moderator,
    Member,
}

impl AuthorBadge {
    /// `None` for badge kinds the pipeline ignores (verified, unknown).
    pub fn kind(&self) -> Option<BadgeKind> {
        match self.renderer.icon.as_ref().map(|i| i.icon_type.as_str()) {
            Some("OWNER") => Some(BadgeKind::Owner),
            Some("MODERATOR") => Some(BadgeKind::Moderator),
            Some("MEMBER") => Some(BadgeKind::Member),
            Some(_) => None,
            None if self.renderer.custom_thumbnail.is_some() => Some(BadgeKind::Member),
            None => None,
        }
    }
}

impl LiveChatTextMessageRenderer {
    /// Normalize into a [`ChatMessage`]. `None` when the message has no text.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        let text = self.message.to_plain_text();
        if text.is_empty() {
            return None;
        }

        let badges: Vec<BadgeKind> = self.author_badges.iter().filter_map(|b| b.kind()).collect();

        Some(ChatMessage {
            id: self.id.clone(),
            author_id: self.author_external_channel_id.clone(),
            author_name: self
                .author_name
                .as_ref()
                .map(|n| n.simple_text.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            text,
            published_at: self.timestamp_usec.clone(),
            is_owner: badges.contains(&BadgeKind::Owner),
            is_moderator: badges.contains(&BadgeKind::Moderator),
            is_member: badges.contains(&BadgeKind::Member),
        })
    }
}

impl GetLiveChatResponse {
    fn live_chat_continuation(&self) -> Option<&LiveChatContinuation> {
        self.continuation_contents
            .as_ref()
            .map(|c| &c.live_chat_continuation)
    }

    /// Text messages in delivery order; every other event is dropped.
    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        let Some(chat) = self.live_chat_continuation() else {
            return Vec::new();
        };

        chat.actions
            .iter()
            .filter_map(|action| match action {
                Action::AddChatItem(wrapper) => match &wrapper.action.item {
                    ChatItem::TextMessage { renderer } => renderer.to_chat_message(),
                    ChatItem::Unknown(_) => None,
                },
                Action::Unknown(_) => None,
            })
            .collect()
    }
}

/// Extract the handle for the next request.
///
/// A live (invalidation) handle wins over a timed one, which wins over a
/// reload handle, regardless of their order in the array.
pub fn get_next_continuation(response: &GetLiveChatResponse) -> Option<NextContinuation> {
    let chat = response.live_chat_continuation()?;

    let pickers: [fn(&ContinuationData) -> Option<&ContinuationBlock>; 3] = [
        |c| c.invalidation.as_ref(),
        |c| c.timed.as_ref(),
        |c| c.reload.as_ref(),
    ];

    pickers.iter().find_map(|pick| {
        chat.continuations.iter().filter_map(|c| pick(c)).find_map(|block| {
            block.handle().map(|continuation| NextContinuation {
                continuation: continuation.clone(),
                timeout_ms: block.timeout_ms,
            })
        })
    })
}

/// Convert the server hint into a wait, falling back to 5s and never below 1s.
pub fn recommended_wait(timeout_ms: Option<u64>) -> Duration {
    match timeout_ms {
        Some(ms) => Duration::from_millis(ms).max(MIN_WAIT),
        None => FALLBACK_WAIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_action(id: &str, author: &str, runs: serde_json::Value) -> serde_json::Value {
        json!({
            "clickTrackingParams": "CAEQl98BIhMI",
            "addChatItemAction": {
                "item": {
                    "liveChatTextMessageRenderer": {
                        "id": id,
                        "message": { "runs": runs },
                        "authorName": { "simpleText": format!("@{author}") },
                        "authorExternalChannelId": author,
                        "timestampUsec": "1700000000000000",
                        "authorPhoto": { "thumbnails": [] }
                    }
                },
                "clientId": "CKr1"
            }
        })
    }

    fn response(actions: Vec<serde_json::Value>, continuations: serde_json::Value) -> GetLiveChatResponse {
        serde_json::from_value(json!({
            "responseContext": { "serviceTrackingParams": [] },
            "continuationContents": {
                "liveChatContinuation": {
                    "actions": actions,
                    "continuations": continuations
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_text_messages_are_normalized() {
        let resp = response(
            vec![text_action("m1", "UC_a", json!([{ "text": "hello " }, { "text": "world" }]))],
            json!([]),
        );

        let messages = resp.chat_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].author_id, "UC_a");
        assert_eq!(messages[0].author_name, "@UC_a");
        assert_eq!(messages[0].text, "hello world");
        assert_eq!(messages[0].published_at, "1700000000000000");
        assert!(!messages[0].is_owner);
    }

    #[test]
    fn test_emoji_runs_use_emoji_id() {
        let resp = response(
            vec![text_action(
                "m1",
                "UC_a",
                json!([
                    { "text": "gg " },
                    { "emoji": { "emojiId": "🔥", "shortcuts": [":fire:"], "image": { "thumbnails": [] } } },
                    { "emoji": { "image": { "thumbnails": [] } } }
                ]),
            )],
            json!([]),
        );

        assert_eq!(resp.chat_messages()[0].text, "gg 🔥");
    }

    #[test]
    fn test_non_text_and_incomplete_items_are_skipped() {
        let paid = json!({
            "addChatItemAction": {
                "item": {
                    "liveChatPaidMessageRenderer": {
                        "id": "paid1",
                        "authorExternalChannelId": "UC_p",
                        "purchaseAmountText": { "simpleText": "$5.00" }
                    }
                }
            }
        });
        let missing_author = json!({
            "addChatItemAction": {
                "item": {
                    "liveChatTextMessageRenderer": {
                        "id": "m2",
                        "message": { "runs": [{ "text": "no author" }] }
                    }
                }
            }
        });
        let removal = json!({ "removeChatItemAction": { "targetItemId": "m0" } });
        let empty_text = text_action("m3", "UC_e", json!([]));
        let ok = text_action("m4", "UC_ok", json!([{ "text": "kept" }]));

        let resp = response(vec![paid, missing_author, removal, empty_text, ok], json!([]));
        let messages = resp.chat_messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m4");
    }

    #[test]
    fn test_badges_set_role_flags() {
        let mut action = text_action("m1", "UC_a", json!([{ "text": "hi" }]));
        action["addChatItemAction"]["item"]["liveChatTextMessageRenderer"]["authorBadges"] = json!([
            { "liveChatAuthorBadgeRenderer": { "icon": { "iconType": "OWNER" }, "tooltip": "Owner" } },
            { "liveChatAuthorBadgeRenderer": { "icon": { "iconType": "MODERATOR" }, "tooltip": "Moderator" } },
            { "liveChatAuthorBadgeRenderer": { "icon": { "iconType": "VERIFIED" }, "tooltip": "Verified" } },
            { "liveChatAuthorBadgeRenderer": { "customThumbnail": { "thumbnails": [] }, "tooltip": "Member (1 year)" } }
        ]);

        let messages = response(vec![action], json!([])).chat_messages();
        assert!(messages[0].is_owner);
        assert!(messages[0].is_moderator);
        assert!(messages[0].is_member);
    }

    #[test]
    fn test_unknown_badges_are_ignored() {
        let mut action = text_action("m1", "UC_a", json!([{ "text": "hi" }]));
        action["addChatItemAction"]["item"]["liveChatTextMessageRenderer"]["authorBadges"] = json!([
            { "liveChatAuthorBadgeRenderer": { "icon": { "iconType": "VERIFIED" } } },
            { "somethingElse": {} }
        ]);

        let messages = response(vec![action], json!([])).chat_messages();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].is_owner && !messages[0].is_moderator && !messages[0].is_member);
    }

    #[test]
    fn test_missing_author_name_defaults_to_unknown() {
        let mut action = text_action("m1", "UC_a", json!([{ "text": "hi" }]));
        action["addChatItemAction"]["item"]["liveChatTextMessageRenderer"]
            .as_object_mut()
            .unwrap()
            .remove("authorName");

        let messages = response(vec![action], json!([])).chat_messages();
        assert_eq!(messages[0].author_name, "Unknown");
    }

    #[test]
    fn test_invalidation_preferred_over_timed() {
        let resp = response(
            vec![],
            json!([
                { "timedContinuationData": { "continuation": "timed", "timeoutMs": 8000 } },
                { "invalidationContinuationData": { "continuation": "live", "timeoutMs": 3000 } }
            ]),
        );

        let next = get_next_continuation(&resp).unwrap();
        assert_eq!(next.continuation.0, "live");
        assert_eq!(next.timeout_ms, Some(3000));
    }

    #[test]
    fn test_timed_used_when_no_invalidation() {
        let resp = response(
            vec![],
            json!([{ "timedContinuationData": { "continuation": "timed", "timeoutMs": 8000 } }]),
        );

        let next = get_next_continuation(&resp).unwrap();
        assert_eq!(next.continuation.0, "timed");
        assert_eq!(next.timeout_ms, Some(8000));
    }

    #[test]
    fn test_no_continuation() {
        assert!(get_next_continuation(&response(vec![], json!([]))).is_none());
        assert!(get_next_continuation(&GetLiveChatResponse::default()).is_none());

        let empty_handle = response(
            vec![],
            json!([{ "invalidationContinuationData": { "continuation": "" } }]),
        );
        assert!(get_next_continuation(&empty_handle).is_none());
    }

    #[test]
    fn test_response_without_contents_parses() {
        let resp: GetLiveChatResponse =
            serde_json::from_value(json!({ "responseContext": {} })).unwrap();
        assert!(resp.chat_messages().is_empty());
    }

    #[test]
    fn test_recommended_wait() {
        assert_eq!(recommended_wait(None), Duration::from_secs(5));
        assert_eq!(recommended_wait(Some(2500)), Duration::from_millis(2500));
        assert_eq!(recommended_wait(Some(200)), Duration::from_secs(1));
        assert_eq!(recommended_wait(Some(0)), Duration::from_secs(1));
    }

    #[test]
    fn test_chat_item_type() {
        let item: ChatItem = serde_json::from_value(json!({ "liveChatPaidMessageRenderer": {} })).unwrap();
        assert!(matches!(item, ChatItem::Unknown(_)));
    }
}
