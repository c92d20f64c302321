pub mod console;
pub mod discord;

use crate::core::error::AibudError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A message delivered by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Session key: the guild, or the channel for direct messages.
    pub room_id: String,
    /// Where replies go.
    pub channel_id: String,
    pub message_id: Option<String>,
    pub author_is_bot: bool,
    pub display_name: String,
    pub text: String,
}

/// Chat platform seam: a source of inbound events and a sink for replies.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Forward inbound events to `events` until the connection ends.
    async fn listen(&self, events: mpsc::Sender<InboundEvent>) -> Result<(), AibudError>;

    async fn reply(&self, event: &InboundEvent, text: &str) -> Result<(), AibudError>;

    async fn send_typing(&self, event: &InboundEvent) -> Result<(), AibudError>;

    /// Whether the application should reconnect after `listen` returns.
    fn reconnects(&self) -> bool {
        false
    }
}
