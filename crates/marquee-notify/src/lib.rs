//! Marquee Notify - Notification senders
//!
//! Instance lifecycle messages (created, deployed, destroyed) are delivered
//! through the [`Notifier`] trait. A chat webhook is the production sender;
//! the other implementations cover local runs and tests.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod notifier;
pub mod webhook;

pub use error::{NotifyError, Result};
pub use notifier::{LogNotifier, NoopNotifier, Notifier, RecordingNotifier};
pub use webhook::WebhookNotifier;
