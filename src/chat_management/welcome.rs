//! First-time viewer welcome with persistence across restarts.

use std::collections::BTreeSet;
use std::path::Path;

use crate::io::JsonStore;
use crate::models::ChatMessage;

pub const DEFAULT_WELCOME_TEMPLATE: &str = "Welcome to the stream, {username}! 🎉";

/// Tracks the author ids a stream has already greeted (or must never greet).
#[derive(Debug)]
pub struct WelcomeTracker {
    seen: BTreeSet<String>,
    bot_channel_id: Option<String>,
    owner_channel_id: Option<String>,
    store: Option<JsonStore>,
    template: String,
}

/// File name for a chat handle: `welcomed_<first 20 chars>.json`, path separators replaced.
pub fn store_file_name(chat_handle: &str) -> String {
    let safe_id: String = chat_handle
        .chars()
        .take(20)
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("welcomed_{}.json", safe_id)
}

impl WelcomeTracker {
    /// Persisted when a chat handle is known, memory-only otherwise.
    pub fn new(chat_handle: Option<&str>, data_dir: &Path, template: impl Into<String>) -> Self {
        match chat_handle.filter(|h| !h.is_empty()) {
            Some(handle) => Self::for_chat(data_dir, handle, template),
            None => Self::in_memory(template),
        }
    }

    /// Memory-only tracker.
    pub fn in_memory(template: impl Into<String>) -> Self {
        Self {
            seen: BTreeSet::new(),
            bot_channel_id: None,
            owner_channel_id: None,
            store: None,
            template: template.into(),
        }
    }

    /// Tracker persisted under `data_dir`, one file per chat handle.
    pub fn for_chat(data_dir: &Path, chat_handle: &str, template: impl Into<String>) -> Self {
        let store = JsonStore::new(data_dir.join(store_file_name(chat_handle)));
        let seen = store.load_set();
        if !seen.is_empty() {
            tracing::info!("📂 Loaded {} previously welcomed viewer(s)", seen.len());
        }

        Self {
            seen,
            store: Some(store),
            ..Self::in_memory(template)
        }
    }

    /// `true` exactly once per author id; bot and owner are never new.
    pub fn is_new(&mut self, author_id: &str) -> bool {
        if author_id.is_empty() || self.is_excluded(author_id) || self.seen.contains(author_id) {
            return false;
        }

        self.seen.insert(author_id.to_string());
        self.persist();
        true
    }

    fn is_excluded(&self, author_id: &str) -> bool {
        self.bot_channel_id.as_deref() == Some(author_id)
            || self.owner_channel_id.as_deref() == Some(author_id)
    }

    /// Record every author of a batch without greeting anyone.
    pub fn seed_from_history(&mut self, messages: &[ChatMessage]) {
        let before = self.seen.len();
        for msg in messages.iter().filter(|m| !m.author_id.is_empty()) {
            self.seen.insert(msg.author_id.clone());
        }

        let added = self.seen.len() - before;
        if added > 0 {
            self.persist();
            tracing::info!(
                "📜 Seeded {} viewer(s) from chat history (won't be re-welcomed)",
                added
            );
        }
    }

    /// Render the greeting. Falls back to the default phrase if the template is malformed.
    pub fn get_welcome_message(&self, display_name: &str) -> String {
        render_template(&self.template, display_name).unwrap_or_else(|| {
            tracing::debug!("⚠️ Malformed welcome template, using default");
            format!("Welcome to the stream, {}! 🎉", display_name)
        })
    }

    pub fn set_bot_channel_id(&mut self, channel_id: &str) {
        self.bot_channel_id = Some(channel_id.to_string());
        self.seen.insert(channel_id.to_string());
        self.persist();
    }

    pub fn set_owner_channel_id(&mut self, channel_id: &str) {
        self.owner_channel_id = Some(channel_id.to_string());
        self.seen.insert(channel_id.to_string());
        self.persist();
    }

    /// Unique viewers tracked (welcomed + seeded + excluded).
    pub fn welcomed_count(&self) -> usize {
        self.seen.len()
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save_set(&self.seen) {
                tracing::error!("❌ Could not save welcomed viewers: {}", e);
            }
        }
    }
}

/// `{username}` is substituted, `{{` and `}}` are literal braces; anything else is malformed.
fn render_template(template: &str, username: &str) -> Option<String> {
    let mut out = String::with_capacity(template.len() + username.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        ch => key.push(ch),
                    }
                }
                if key != "username" {
                    return None;
                }
                out.push_str(username);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return None,
            ch => out.push(ch),
        }
    }
    Some(out)
}
