//! Discord channel adapter using serenity

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::Client;
use serenity::all::{
    ChannelId, Context, CreateMessage, EventHandler, GatewayIntents, Message, MessageId,
    Ready,
};
use serenity::cache::Cache;
use tokio::sync::mpsc;

use super::{BotIdentity, Channel, INBOUND_QUEUE, InboundMessage, OutgoingMessage};
use crate::{Error, Result};

/// Discord channel adapter
pub struct DiscordChannel {
    token: SecretString,
    message_tx: mpsc::Sender<InboundMessage>,
    http: Option<Arc<serenity::http::Http>>,
    identity: Arc<RwLock<Option<BotIdentity>>>,
    connected: bool,
}

impl DiscordChannel {
    /// Create a Discord adapter and the receiver for its inbound messages
    #[must_use]
    pub fn with_receiver(token: SecretString) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let channel = Self {
            token,
            message_tx: tx,
            http: None,
            identity: Arc::new(RwLock::new(None)),
            connected: false,
        };
        (channel, rx)
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn connect(&mut self) -> Result<()> {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILDS;

        let handler = DiscordHandler {
            message_tx: self.message_tx.clone(),
            identity: Arc::clone(&self.identity),
        };

        let client = Client::builder(self.token.expose_secret(), intents)
            .event_handler(handler)
            .await
            .map_err(|e| Error::Channel(format!("Discord client error: {e}")))?;

        self.http = Some(client.http.clone());

        // Spawn the gateway connection in a background task
        let mut client_runner = client;
        tokio::spawn(async move {
            if let Err(e) = client_runner.start().await {
                tracing::error!(error = %e, "Discord client error");
            }
        });

        self.connected = true;
        tracing::info!("Discord channel connected");

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        tracing::info!("Discord channel disconnected");
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| Error::Channel("Discord not connected".to_string()))?;

        let channel_id: u64 = message
            .channel_id
            .parse()
            .map_err(|_| Error::Channel("Invalid channel ID".to_string()))?;
        let channel = ChannelId::new(channel_id);

        let mut builder = CreateMessage::new().content(&message.content);
        if let Some(reply_to) = message.reply_to.as_deref().and_then(|id| id.parse::<u64>().ok())
        {
            builder = builder.reference_message((channel, MessageId::new(reply_to)));
        }

        channel
            .send_message(http, builder)
            .await
            .map_err(|e| Error::Channel(format!("Discord send error: {e}")))?;

        tracing::debug!(channel_id = %message.channel_id, "Discord message sent");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn identity(&self) -> Option<BotIdentity> {
        self.identity
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Discord event handler
struct DiscordHandler {
    message_tx: mpsc::Sender<InboundMessage>,
    identity: Arc<RwLock<Option<BotIdentity>>>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "Discord bot ready");
        let identity = BotIdentity {
            user_id: ready.user.id.to_string(),
            display_name: ready.user.name.clone(),
        };
        *self
            .identity
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(identity);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Every message is forwarded, including ones not addressed to the bot:
        // predictors such as the author history observe the whole channel.
        let inbound = inbound_from(&msg, &ctx.cache);

        tracing::debug!(
            author = %inbound.author_name,
            content = %inbound.content,
            "Discord message received"
        );

        if let Err(e) = self.message_tx.send(inbound).await {
            tracing::warn!(error = %e, "Failed to forward Discord message");
        }
    }
}

/// Convert a gateway message, rendering mention markup as `@name` text
fn inbound_from(msg: &Message, cache: &Cache) -> InboundMessage {
    InboundMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        author_id: msg.author.id.to_string(),
        author_name: msg.author.display_name().to_string(),
        content: msg.content_safe(cache),
        mentions: msg.mentions.iter().map(|u| u.id.to_string()).collect(),
    }
}
