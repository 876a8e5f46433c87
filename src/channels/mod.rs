//! Chat transport adapters
//!
//! Each transport implements the `Channel` trait. Inbound events are pushed
//! over an mpsc receiver handed out at construction; outbound replies go
//! through `Channel::send`.

mod console;
mod discord;

use async_trait::async_trait;

pub use console::ConsoleChannel;
pub use discord::DiscordChannel;

use crate::Result;

/// Capacity of the inbound message queue between a transport and the router
pub const INBOUND_QUEUE: usize = 100;

/// The bot's own identity on a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// Platform user identifier
    pub user_id: String,

    /// Display name as rendered in message text
    pub display_name: String,
}

/// A raw message event from a transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Message identifier (platform-specific)
    pub id: String,

    /// Channel identifier
    pub channel_id: String,

    /// Author identifier
    pub author_id: String,

    /// Author display name
    pub author_name: String,

    /// Message text with mentions rendered as `@name`
    pub content: String,

    /// Identifiers of users tagged in the message
    pub mentions: Vec<String>,
}

/// A message to send to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Channel identifier
    pub channel_id: String,

    /// Message content
    pub content: String,

    /// Optional reply-to message ID
    pub reply_to: Option<String>,
}

impl OutgoingMessage {
    /// Create a simple `text` message
    #[must_use]
    pub const fn text(channel_id: String, content: String) -> Self {
        Self {
            channel_id,
            content,
            reply_to: None,
        }
    }
}

/// Trait for chat transport adapters
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Connect to the transport
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from the transport
    async fn disconnect(&mut self) -> Result<()>;

    /// Send a message
    async fn send(&self, message: OutgoingMessage) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// The bot's own identity, once known
    ///
    /// Transports that learn the identity during the handshake return `None`
    /// until then.
    fn identity(&self) -> Option<BotIdentity>;
}
