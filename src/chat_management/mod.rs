pub mod commands;
pub mod dedup;
pub mod polls;
pub mod welcome;

pub use commands::{load_commands, CommandDefinition, CommandRouter};
pub use dedup::{DedupWindow, SeenSet};
pub use polls::{parse_poll_command, PollRequest};
pub use welcome::{WelcomeTracker, DEFAULT_WELCOME_TEMPLATE};
