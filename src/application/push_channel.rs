// Push channel seam - the transport the realtime client drives
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub const LIVE_OCCUPANCY_TOPIC: &str = "live_occupancy";
pub const ALERT_TOPIC: &str = "alert";

/// A named event received on the push channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub topic: String,
    pub payload: Value,
}

impl PushEvent {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection timed out")]
    Timeout,

    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server refused the namespace connection (bad token, etc.)
    #[error("connection refused: {0}")]
    Refused(String),
}

#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Open one authenticated link. Resolves once the server accepted it.
    async fn open(&self, token: &str) -> Result<Box<dyn PushConnection>, TransportError>;
}

#[async_trait]
pub trait PushConnection: Send {
    /// Next event on the link; `None` once the link is gone.
    async fn next_event(&mut self) -> Option<PushEvent>;

    async fn close(&mut self);
}
