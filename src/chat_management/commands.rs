//! Prefix commands loaded from a JSON definitions file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// One entry of the definitions file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandDefinition {
    pub action: String,
    pub reply: String,
    pub aliases: Vec<String>,
}

/// Lowercase trigger → reply, plus how many definitions contributed to it.
#[derive(Debug, Default)]
struct CommandTable {
    replies: HashMap<String, String>,
    definitions: usize,
}

impl CommandTable {
    fn build(definitions: &[CommandDefinition]) -> Self {
        let mut table = Self::default();

        for def in definitions {
            let triggers = std::iter::once(&def.action)
                .chain(def.aliases.iter())
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty());

            let mut contributed = false;
            for trigger in triggers {
                table.replies.insert(trigger, def.reply.clone());
                contributed = true;
            }
            if contributed {
                table.definitions += 1;
            }
        }
        table
    }
}

/// Read command definitions. A missing or invalid file yields no definitions.
pub fn load_commands(path: &Path) -> Vec<CommandDefinition> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("⚠️ Commands file {} not readable: {}", path.display(), e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(definitions) => definitions,
        Err(e) => {
            tracing::warn!("⚠️ Invalid JSON in {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Matches chat text against the command table and enforces a per-trigger cooldown.
///
/// The cooldown is global: once a trigger fires, nobody can fire that same
/// trigger again until it expires. Aliases are separate triggers with their
/// own timers.
#[derive(Debug)]
pub struct CommandRouter {
    path: PathBuf,
    prefix: String,
    cooldown: Duration,
    table: CommandTable,
    last_used: HashMap<String, Instant>,
}

impl CommandRouter {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>, cooldown: Duration) -> Self {
        let path = path.into();
        let table = CommandTable::build(&load_commands(&path));
        tracing::info!(
            "📋 Loaded {} command(s), {} trigger(s)",
            table.definitions,
            table.replies.len()
        );

        Self {
            path,
            prefix: prefix.into().to_lowercase(),
            cooldown,
            table,
            last_used: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rebuild the table from disk. Cooldowns survive.
    pub fn reload(&mut self) {
        self.table = CommandTable::build(&load_commands(&self.path));
        tracing::info!(
            "🔄 Commands reloaded: {} command(s), {} trigger(s)",
            self.table.definitions,
            self.table.replies.len()
        );
    }

    pub fn match_text(&mut self, text: &str) -> Option<String> {
        self.match_at(text, Instant::now())
    }

    /// Reply for `text` at `now`, stamping the trigger's cooldown when it fires.
    pub fn match_at(&mut self, text: &str, now: Instant) -> Option<String> {
        let normalized = text.trim().to_lowercase();
        if !normalized.starts_with(&self.prefix) {
            return None;
        }

        let key = normalized.split_whitespace().next()?;
        let reply = self.table.replies.get(key)?;

        if let Some(last) = self.last_used.get(key) {
            if now.saturating_duration_since(*last) < self.cooldown {
                tracing::debug!("⏳ Command {} is on cooldown", key);
                return None;
            }
        }

        self.last_used.insert(key.to_string(), now);
        tracing::info!("⚡ Command triggered: {}", key);
        Some(reply.clone())
    }

    pub fn trigger_count(&self) -> usize {
        self.table.replies.len()
    }

    pub fn command_count(&self) -> usize {
        self.table.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const COMMANDS: &str = r#"[
        {"action": "/discord", "reply": "Join us at discord.gg/example", "aliases": ["/dc"]},
        {"action": "/Rules", "reply": "Be nice."},
        {"reply": "orphan"}
    ]"#;

    fn router_with(content: &str) -> (TempDir, CommandRouter) {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("commands.json");
        std::fs::write(&path, content).unwrap();
        let router = CommandRouter::new(path, "/", Duration::from_secs(5));
        (temp_dir, router)
    }

    #[test]
    fn test_counts() {
        let (_dir, router) = router_with(COMMANDS);
        assert_eq!(router.trigger_count(), 3);
        assert_eq!(router.command_count(), 2);
    }

    #[test]
    fn test_match_is_case_insensitive_and_uses_first_token() {
        let (_dir, mut router) = router_with(COMMANDS);
        let now = Instant::now();

        assert_eq!(
            router.match_at("  /DISCORD please ", now).as_deref(),
            Some("Join us at discord.gg/example")
        );
        assert_eq!(router.match_at("/rules", now).as_deref(), Some("Be nice."));
        assert!(router.match_at("discord", now).is_none());
        assert!(router.match_at("/unknown", now).is_none());
        assert!(router.match_at("hello /rules", now).is_none());
    }

    #[test]
    fn test_cooldown_is_per_trigger() {
        let (_dir, mut router) = router_with(COMMANDS);
        let start = Instant::now();

        assert!(router.match_at("/discord", start).is_some());
        assert!(router.match_at("/discord", start + Duration::from_secs(2)).is_none());
        // Alias has its own timer.
        assert!(router.match_at("/dc", start + Duration::from_secs(2)).is_some());
        assert!(router.match_at("/discord", start + Duration::from_secs(5)).is_some());
    }

    #[test]
    fn test_suppressed_match_does_not_extend_cooldown() {
        let (_dir, mut router) = router_with(COMMANDS);
        let start = Instant::now();

        assert!(router.match_at("/rules", start).is_some());
        assert!(router.match_at("/rules", start + Duration::from_secs(4)).is_none());
        assert!(router.match_at("/rules", start + Duration::from_secs(5)).is_some());
    }

    #[test]
    fn test_reload_keeps_cooldowns() {
        let (dir, mut router) = router_with(COMMANDS);
        let start = Instant::now();
        assert!(router.match_at("/rules", start).is_some());

        std::fs::write(
            dir.path().join("commands.json"),
            r#"[{"action": "/rules", "reply": "Updated rules."}, {"action": "/new", "reply": "new!"}]"#,
        )
        .unwrap();
        router.reload();

        assert_eq!(router.trigger_count(), 2);
        assert!(router.match_at("/rules", start + Duration::from_secs(1)).is_none());
        assert_eq!(
            router.match_at("/rules", start + Duration::from_secs(6)).as_deref(),
            Some("Updated rules.")
        );
        assert!(router.match_at("/discord", start).is_none());
    }

    #[test]
    fn test_missing_or_invalid_file_is_empty() {
        let temp_dir = tempdir().unwrap();
        let mut missing = CommandRouter::new(
            temp_dir.path().join("nope.json"),
            "/",
            Duration::from_secs(5),
        );
        assert_eq!(missing.trigger_count(), 0);
        assert!(missing.match_text("/discord").is_none());

        let (_dir, invalid) = router_with("{ not json");
        assert_eq!(invalid.trigger_count(), 0);
        assert_eq!(invalid.command_count(), 0);
    }

    #[test]
    fn test_custom_prefix() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("commands.json");
        std::fs::write(&path, r#"[{"action": "!so", "reply": "shoutout"}]"#).unwrap();

        let mut router = CommandRouter::new(path, "!", Duration::ZERO);
        assert_eq!(router.match_text("!so").as_deref(), Some("shoutout"));
        assert_eq!(router.match_text("!so").as_deref(), Some("shoutout"));
        assert!(router.match_text("/so").is_none());
    }
}
