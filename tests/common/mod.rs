//! Shared test utilities
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lex_bot::channels::{BotIdentity, Channel, InboundMessage, OutgoingMessage};
use lex_bot::generation::{GenerationRequest, TextGenerator};
use lex_bot::{Error, Result};
use tokio::sync::Mutex;

/// User ID of the bot on the mock transport
pub const BOT_ID: &str = "999";

/// Display name of the bot on the mock transport
pub const BOT_NAME: &str = "Lex";

/// Mock channel that records everything sent through it
pub struct MockChannel {
    sent_messages: Mutex<Vec<OutgoingMessage>>,
    failures_left: AtomicUsize,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Self::failing(0)
    }

    /// A channel whose first `failures` sends fail
    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            sent_messages: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(failures),
        })
    }

    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent_messages.lock().await.clone()
    }

    pub async fn sent_contents(&self) -> Vec<String> {
        self.sent().await.into_iter().map(|m| m.content).collect()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(Error::Channel("send failed".to_string()));
        }
        self.sent_messages.lock().await.push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn identity(&self) -> Option<BotIdentity> {
        Some(BotIdentity {
            user_id: BOT_ID.to_string(),
            display_name: BOT_NAME.to_string(),
        })
    }
}

/// Upcast for router calls
pub fn as_channel(channel: &Arc<MockChannel>) -> Arc<dyn Channel> {
    Arc::clone(channel) as Arc<dyn Channel>
}

/// Inbound event from "Bob"; `mentioned` tags the bot the way Discord does
pub fn inbound(content: &str, mentioned: bool) -> InboundMessage {
    let (content, mentions) = if mentioned {
        (format!("@{BOT_NAME} {content}"), vec![BOT_ID.to_string()])
    } else {
        (content.to_string(), Vec::new())
    };
    InboundMessage {
        id: "100".to_string(),
        channel_id: "general".to_string(),
        author_id: "7".to_string(),
        author_name: "Bob".to_string(),
        content,
        mentions,
    }
}

/// Generator replaying scripted outputs, repeating the last one
pub struct ScriptedGenerator {
    outputs: Vec<String>,
    requests: std::sync::Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(outputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outputs: outputs.iter().map(ToString::to_string).collect(),
            requests: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut requests = self.requests.lock().unwrap();
        let out = self
            .outputs
            .get(requests.len())
            .or_else(|| self.outputs.last())
            .cloned()
            .unwrap_or_default();
        requests.push(request.clone());
        Ok(out)
    }
}
