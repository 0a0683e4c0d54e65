pub mod api;
pub mod bot;
pub mod chat_management;
pub mod config;
pub mod io;
pub mod logging;
pub mod manager;
pub mod models;
pub mod traits;

pub use api::innertube::get_live_chat;

pub use api::data_api::ResolveError;
pub use api::innertube::ConnectionError;
pub use api::publisher::PublishError;
pub use bot::BotError;

pub use api::innertube::LiveChatClient;
pub use bot::{resolve_stream, BotState, ModeratorBot, SessionSummary, StreamContext};
pub use manager::{BotManager, BotStatus};
pub use models::ChatMessage;
pub use traits::{ChatPublisher, ChatSource, PollBatch, StreamResolver};
