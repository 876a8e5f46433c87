//! Console channel adapter for local testing
//!
//! Reads one message per stdin line and prints replies to stdout. Lines are
//! authored by a fixed local user; prefix a line with `@<bot name>` to
//! address the bot.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::{BotIdentity, Channel, INBOUND_QUEUE, InboundMessage, OutgoingMessage};
use crate::Result;

/// Channel identifier used for every console message
pub const CONSOLE_CHANNEL_ID: &str = "console";

/// Stdin/stdout channel adapter
pub struct ConsoleChannel {
    identity: BotIdentity,
    author_name: String,
    message_tx: Option<mpsc::Sender<InboundMessage>>,
    connected: bool,
}

impl ConsoleChannel {
    /// Create a console adapter and the receiver for its inbound messages
    #[must_use]
    pub fn with_receiver(
        bot_name: &str,
        author_name: &str,
    ) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let channel = Self {
            identity: BotIdentity {
                user_id: "0".to_string(),
                display_name: bot_name.to_string(),
            },
            author_name: author_name.to_string(),
            message_tx: Some(tx),
            connected: false,
        };
        (channel, rx)
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn connect(&mut self) -> Result<()> {
        // The sender moves into the reader task; the receiver closes on EOF
        let Some(tx) = self.message_tx.take() else {
            return Ok(());
        };
        let author_name = self.author_name.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut counter: u64 = 0;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        counter += 1;
                        let inbound = InboundMessage {
                            id: counter.to_string(),
                            channel_id: CONSOLE_CHANNEL_ID.to_string(),
                            author_id: "1".to_string(),
                            author_name: author_name.clone(),
                            content: line,
                            mentions: Vec::new(),
                        };
                        if tx.send(inbound).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read console input");
                        break;
                    }
                }
            }
        });

        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        println!("{}> {}", self.identity.display_name, message.content);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn identity(&self) -> Option<BotIdentity> {
        Some(self.identity.clone())
    }
}
