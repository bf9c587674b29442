//! Outbound customer notifications.
//!
//! A [`Notifier`] knows how to reach an order owner. The server only ever sends two kinds of thing: a plain text
//! message, and a delivered payload with a caption. How these reach the customer (a chat bot, email, a web socket) is
//! up to whatever is listening on the other side of the webhook.
use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Could not initialise the notifier. {0}")]
    Initialization(String),
    #[error("Could not deliver the notification. {0}")]
    DeliveryFailed(String),
    #[error("The notification endpoint rejected the message. Status {status}. {message}")]
    Rejected { status: u16, message: String },
}

#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotifierError>;

    async fn send_payload(&self, recipient: &str, payload_ref: &str, caption: &str) -> Result<(), NotifierError>;
}

/// The JSON body POSTed by [`WebhookNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Message { recipient: String, text: String },
    Payload { recipient: String, payload_ref: String, caption: String },
}

#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Arc<Client>,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifierError> {
        let client =
            Client::builder().timeout(timeout).build().map_err(|e| NotifierError::Initialization(e.to_string()))?;
        Ok(Self { url: url.to_string(), client: Arc::new(client) })
    }

    async fn post(&self, notification: &Notification) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(self.url.as_str())
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifierError::DeliveryFailed(e.to_string()))?;
        if response.status().is_success() {
            trace!("📨️ Notification accepted. {}", response.status());
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(NotifierError::Rejected { status, message })
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotifierError> {
        self.post(&Notification::Message { recipient: recipient.to_string(), text: text.to_string() }).await
    }

    async fn send_payload(&self, recipient: &str, payload_ref: &str, caption: &str) -> Result<(), NotifierError> {
        let notification = Notification::Payload {
            recipient: recipient.to_string(),
            payload_ref: payload_ref.to_string(),
            caption: caption.to_string(),
        };
        self.post(&notification).await
    }
}

/// Writes notifications to the log and nowhere else.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotifierError> {
        info!("📨️ To {recipient}: {text}");
        Ok(())
    }

    async fn send_payload(&self, recipient: &str, payload_ref: &str, caption: &str) -> Result<(), NotifierError> {
        info!("📨️ To {recipient}: [{payload_ref}] {caption}");
        Ok(())
    }
}

/// The configured notification channel.
#[derive(Clone)]
pub enum NotificationSink {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl NotificationSink {
    /// Uses the webhook if a URL is given, and the log otherwise.
    pub fn from_config(webhook_url: Option<&str>, timeout: Duration) -> Result<Self, NotifierError> {
        match webhook_url {
            Some(url) => {
                info!("📨️ Customer notifications will be POSTed to {url}");
                Ok(Self::Webhook(WebhookNotifier::new(url, timeout)?))
            },
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for NotificationSink {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), NotifierError> {
        match self {
            Self::Webhook(n) => n.send_message(recipient, text).await,
            Self::Log(n) => n.send_message(recipient, text).await,
        }
    }

    async fn send_payload(&self, recipient: &str, payload_ref: &str, caption: &str) -> Result<(), NotifierError> {
        match self {
            Self::Webhook(n) => n.send_payload(recipient, payload_ref, caption).await,
            Self::Log(n) => n.send_payload(recipient, payload_ref, caption).await,
        }
    }
}
