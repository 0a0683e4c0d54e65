//! Start/stop handle for one background moderation loop.

use std::future::Future;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(thiserror::Error, Debug)]
pub enum ManagerError {
    #[error("Bot is already running on video {0}")]
    AlreadyRunning(String),
}

/// Snapshot reported by [`BotManager::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotStatus {
    pub running: bool,
    pub video_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

struct RunningBot {
    video_id: String,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    finished: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

/// Owns at most one running loop. Instances share nothing.
#[derive(Default)]
pub struct BotManager {
    current: Mutex<Option<RunningBot>>,
}

impl BotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `run` with a fresh cancellation token.
    ///
    /// A previous loop that already finished on its own is replaced.
    pub fn start<F, Fut>(&self, video_id: impl Into<String>, run: F) -> Result<(), ManagerError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut current = self.current.lock();
        if let Some(bot) = current.as_ref() {
            if !bot.handle.is_finished() {
                return Err(ManagerError::AlreadyRunning(bot.video_id.clone()));
            }
        }

        let video_id = video_id.into();
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let task = run(cancel.clone());

        let done = finished.clone();
        let handle = tokio::spawn(async move {
            let result = task.await;
            done.cancel();
            result
        });

        tracing::info!(video_id = %video_id, "▶️ Bot started");
        *current = Some(RunningBot {
            video_id,
            started_at: Utc::now(),
            cancel,
            finished,
            handle,
        });
        Ok(())
    }

    /// Cancel the loop and wait for it. `None` when nothing was started.
    pub async fn stop(&self) -> Option<anyhow::Result<()>> {
        let bot = self.current.lock().take()?;
        bot.cancel.cancel();

        let result = match bot.handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("Bot task failed: {}", e)),
        };
        tracing::info!(video_id = %bot.video_id, "⏹️ Bot stopped");
        Some(result)
    }

    /// Resolves once the current loop exits on its own (or immediately if none).
    pub async fn finished(&self) {
        let finished = self.current.lock().as_ref().map(|bot| bot.finished.clone());
        if let Some(finished) = finished {
            finished.cancelled().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|bot| !bot.handle.is_finished())
    }

    pub fn status(&self) -> BotStatus {
        let current = self.current.lock();
        match current.as_ref().filter(|bot| !bot.handle.is_finished()) {
            Some(bot) => BotStatus {
                running: true,
                video_id: Some(bot.video_id.clone()),
                started_at: Some(bot.started_at),
                uptime_secs: (Utc::now() - bot.started_at).num_seconds().max(0) as u64,
            },
            None => BotStatus {
                running: false,
                video_id: None,
                started_at: None,
                uptime_secs: 0,
            },
        }
    }
}
