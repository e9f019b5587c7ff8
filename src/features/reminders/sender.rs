//! Channel delivery seam
//!
//! The scheduling engine never talks to the chat platform directly; it sends
//! through this trait. `DiscordSender` is the serenity-backed production
//! implementation.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use async_trait::async_trait;
use serenity::http::{Http, HttpError};
use serenity::model::id::ChannelId;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("channel {0} not found")]
    ChannelNotFound(String),
    #[error("missing permission to post in channel {0}")]
    Forbidden(String),
    #[error("rate limited posting to channel {0}")]
    RateLimited(String),
    #[error("delivery failed: {0}")]
    Other(String),
}

/// Sends one message to one channel
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Delivery through the Discord REST API
pub struct DiscordSender {
    http: Arc<Http>,
}

impl DiscordSender {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordSender { http }
    }
}

#[async_trait]
impl ChannelSender for DiscordSender {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError> {
        let id: u64 = channel_id
            .parse()
            .map_err(|_| DeliveryError::ChannelNotFound(channel_id.to_string()))?;

        ChannelId(id)
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| classify(channel_id, e))
    }
}

fn classify(channel_id: &str, error: serenity::Error) -> DeliveryError {
    match error {
        serenity::Error::Http(http_error) => match *http_error {
            HttpError::UnsuccessfulRequest(response) => match response.status_code.as_u16() {
                404 => DeliveryError::ChannelNotFound(channel_id.to_string()),
                403 => DeliveryError::Forbidden(channel_id.to_string()),
                429 => DeliveryError::RateLimited(channel_id.to_string()),
                _ => DeliveryError::Other(response.error.message),
            },
            other => DeliveryError::Other(other.to_string()),
        },
        other => DeliveryError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSender;

    #[async_trait]
    impl ChannelSender for NullSender {
        async fn send(&self, _channel_id: &str, _text: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    // Trait must stay object-safe for injection into the service
    fn _assert_object_safe(_: &dyn ChannelSender) {}

    #[tokio::test]
    async fn test_non_numeric_channel_id_is_not_found() {
        let sender = DiscordSender::new(Arc::new(Http::new("unused-token")));
        let result = sender.send("not-a-snowflake", "hi").await;
        assert!(matches!(result, Err(DeliveryError::ChannelNotFound(_))));
    }

    #[tokio::test]
    async fn test_null_sender() {
        assert!(NullSender.send("1", "hi").await.is_ok());
    }
}
