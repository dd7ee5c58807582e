//! Notifier trait and local implementations

use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use marquee_types::Message;
use tokio::sync::Mutex;
use tracing::info;

/// Delivers messages to an external channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}

/// Writes messages to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        info!(text = %message.plain_text(), "Notification");
        Ok(())
    }
}

/// Drops every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _message: &Message) -> Result<()> {
        Ok(())
    }
}

/// Keeps every message in memory. Can be told to reject sends.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<Message>>,
    reject: Mutex<Option<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every following send with `reason`
    pub async fn reject_with(&self, reason: impl Into<String>) {
        *self.reject.lock().await = Some(reason.into());
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        if let Some(reason) = self.reject.lock().await.clone() {
            return Err(NotifyError::Rejected(reason));
        }
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}
