//! Notification messages sent to external channels

use serde::{Deserialize, Serialize};

/// A chat-style message made of free-text attachments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub attachments: Vec<Attachment>,
}

/// One block of message text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Attachment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

impl Message {
    /// A message with a single plain attachment
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            attachments: vec![Attachment::text(text)],
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// All attachment texts joined by newlines
    pub fn plain_text(&self) -> String {
        self.attachments
            .iter()
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
