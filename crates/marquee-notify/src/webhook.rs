//! Chat webhook notifier
//!
//! Posts the message as JSON, `{"attachments": [{"text": ..., "color": ...}]}`,
//! which is the incoming-webhook format chat services accept.

use crate::error::{NotifyError, Result};
use crate::notifier::Notifier;
use async_trait::async_trait;
use marquee_types::Message;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Sends messages to an incoming webhook URL
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &Message) -> Result<()> {
        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Webhook notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_types::Attachment;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one request, answering with `status_line`, and return the body
    /// that was posted
    async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            let body = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    let body = &text[split + 4..];
                    if body.len() >= length {
                        break body.to_string();
                    }
                }
                if n == 0 {
                    break String::new();
                }
            };

            let response = format!("{}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok", status_line);
            socket.write_all(response.as_bytes()).await.unwrap();
            body
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_posts_attachments() {
        let (url, server) = serve_once("HTTP/1.1 200 OK").await;
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();

        let message = Message::text("Instance was deployed: web a.")
            .with_attachment(Attachment::text("ready").with_color("good"));
        notifier.send(&message).await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["attachments"][0]["text"], "Instance was deployed: web a.");
        assert_eq!(body["attachments"][1]["color"], "good");
    }

    #[tokio::test]
    async fn test_error_status() {
        let (url, server) = serve_once("HTTP/1.1 500 Internal Server Error").await;
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();

        let err = notifier.send(&Message::text("hi")).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 500, .. }));
        server.await.unwrap();
    }
}
