//! Outbound chat writes.

use async_trait::async_trait;

use crate::traits::ChatPublisher;

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    /// The write API refused the action for this account (HTTP 403).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Write API returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Truncated preview used when logging outbound text.
pub fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    if text.chars().count() > MAX_CHARS {
        format!("{}...", text.chars().take(MAX_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Publisher used when no write credentials are configured. Logs instead of sending.
#[derive(Debug, Default, Clone)]
pub struct DryRunPublisher;

#[async_trait]
impl ChatPublisher for DryRunPublisher {
    async fn publish(&self, chat_handle: &str, text: &str) -> Result<(), PublishError> {
        tracing::info!(chat = chat_handle, "💬 [dry-run] Would send: {}", preview(text));
        Ok(())
    }

    async fn publish_poll(
        &self,
        chat_handle: &str,
        question: &str,
        options: &[String],
    ) -> Result<(), PublishError> {
        tracing::info!(
            chat = chat_handle,
            options = ?options,
            "📊 [dry-run] Would create poll: '{}'",
            question
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_text() {
        let long = "a".repeat(100);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 83);
        assert!(short.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_dry_run_publisher_always_succeeds() {
        let publisher = DryRunPublisher;
        assert!(publisher.publish("chat", "hello").await.is_ok());
        assert!(publisher
            .publish_poll("chat", "Q?", &["A".to_string(), "B".to_string()])
            .await
            .is_ok());
    }

    #[test]
    fn test_permission_denied_display() {
        let err = PublishError::PermissionDenied("only the owner can create polls".to_string());
        assert_eq!(err.to_string(), "Permission denied: only the owner can create polls");
    }
}
