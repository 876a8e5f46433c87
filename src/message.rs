//! Message normalization
//!
//! Turns a raw transport event into an [`AuthoredMessage`]: resolves the real
//! author of relayed messages, decides whether the bot was addressed, and
//! strips mention artifacts from the text.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::channels::{BotIdentity, Channel, InboundMessage, OutgoingMessage};
use crate::Result;

/// Relay bridges post `‹**name**› text` on behalf of another user
static RELAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^‹\*\*(.+?)\*\*› (.+?)$").expect("relay pattern is valid")
});

/// Typed facts derived during normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageAttributes {
    /// Whether the message is addressed to the bot
    pub self_mention: bool,
}

/// Where a message came from, and how to answer it
#[derive(Clone)]
pub struct MessageOrigin {
    /// Platform message identifier
    pub message_id: String,

    /// Platform channel identifier
    pub channel_id: String,

    /// Platform author identifier
    pub author_id: String,

    channel: Arc<dyn Channel>,
}

impl MessageOrigin {
    /// Create an origin bound to the transport that delivered the message
    #[must_use]
    pub fn new(
        message_id: String,
        channel_id: String,
        author_id: String,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            message_id,
            channel_id,
            author_id,
            channel,
        }
    }
}

impl fmt::Debug for MessageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageOrigin")
            .field("message_id", &self.message_id)
            .field("channel_id", &self.channel_id)
            .field("author_id", &self.author_id)
            .field("channel", &self.channel.name())
            .finish()
    }
}

/// A normalized inbound message
#[derive(Debug, Clone)]
pub struct AuthoredMessage {
    /// Originating platform message
    pub origin: MessageOrigin,

    /// Normalized text content
    pub message_content: String,

    /// Display name of the (possibly relayed) author
    pub author_name: String,

    /// Cross-cutting facts for predictors
    pub attributes: MessageAttributes,
}

impl AuthoredMessage {
    /// Whether the bot was addressed by this message
    #[must_use]
    pub const fn contains_self_mention(&self) -> bool {
        self.attributes.self_mention
    }

    /// Send a text reply to the originating channel
    ///
    /// A failed send is retried once.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the retry also fails
    pub async fn reply(&self, content: impl Into<String>) -> Result<()> {
        let outgoing = OutgoingMessage::text(self.origin.channel_id.clone(), content.into());

        match self.origin.channel.send(outgoing.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    channel = self.origin.channel.name(),
                    error = %e,
                    "reply failed, retrying once"
                );
                self.origin.channel.send(outgoing).await
            }
        }
    }
}

/// Builds [`AuthoredMessage`]s from raw transport events
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    mention_workaround: Option<String>,
}

impl Normalizer {
    /// Create a normalizer
    ///
    /// `mention_workaround` is a literal token that counts as addressing the
    /// bot, for bridges that cannot produce real mentions.
    #[must_use]
    pub fn new(mention_workaround: Option<String>) -> Self {
        Self {
            mention_workaround: mention_workaround.filter(|t| !t.is_empty()),
        }
    }

    /// Normalize a raw event
    ///
    /// Returns `None` for messages authored by the bot itself.
    #[must_use]
    pub fn normalize(
        &self,
        raw: InboundMessage,
        bot: &BotIdentity,
        channel: Arc<dyn Channel>,
    ) -> Option<AuthoredMessage> {
        if raw.author_id == bot.user_id {
            return None;
        }

        let (author_name, mut content) = match RELAY_PATTERN.captures(&raw.content) {
            Some(caps) => (caps[1].replace("\\_", "_"), caps[2].to_string()),
            None => (raw.author_name.clone(), raw.content.clone()),
        };

        let self_mention = self.is_self_mention(&raw, bot);

        let tag = format!("@{}", bot.display_name);
        content = content.replace(&tag, "");
        content = content.replace(&tag.to_lowercase(), "");
        if let Some(token) = &self.mention_workaround {
            content = content.replace(token.as_str(), "");
        }

        Some(AuthoredMessage {
            origin: MessageOrigin::new(raw.id, raw.channel_id, raw.author_id, channel),
            message_content: content.trim().to_string(),
            author_name,
            attributes: MessageAttributes { self_mention },
        })
    }

    fn is_self_mention(&self, raw: &InboundMessage, bot: &BotIdentity) -> bool {
        if raw.mentions.iter().any(|id| id == &bot.user_id) {
            return true;
        }
        if self
            .mention_workaround
            .as_deref()
            .is_some_and(|token| raw.content.contains(token))
        {
            return true;
        }
        raw.content
            .to_lowercase()
            .contains(&format!("@{}", bot.display_name.to_lowercase()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;

    use super::*;

    /// Channel that drops everything; for constructing messages in tests
    pub struct NullChannel;

    #[async_trait]
    impl Channel for NullChannel {
        fn name(&self) -> &'static str {
            "null"
        }

        async fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }

        async fn send(&self, _message: OutgoingMessage) -> Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn identity(&self) -> Option<BotIdentity> {
            None
        }
    }

    pub fn message(content: &str, self_mention: bool) -> AuthoredMessage {
        AuthoredMessage {
            origin: MessageOrigin::new(
                "m1".to_string(),
                "c1".to_string(),
                "u1".to_string(),
                Arc::new(NullChannel),
            ),
            message_content: content.to_string(),
            author_name: "Alice".to_string(),
            attributes: MessageAttributes { self_mention },
        }
    }

    fn bot() -> BotIdentity {
        BotIdentity {
            user_id: "999".to_string(),
            display_name: "Lex".to_string(),
        }
    }

    fn raw(content: &str) -> InboundMessage {
        InboundMessage {
            id: "1".to_string(),
            channel_id: "42".to_string(),
            author_id: "7".to_string(),
            author_name: "Bob".to_string(),
            content: content.to_string(),
            mentions: vec![],
        }
    }

    #[test]
    fn test_relay_format() {
        let normalizer = Normalizer::default();
        let msg = normalizer
            .normalize(raw("‹**Ann**› hi there"), &bot(), Arc::new(NullChannel))
            .unwrap();

        assert_eq!(msg.author_name, "Ann");
        assert_eq!(msg.message_content, "hi there");
    }

    #[test]
    fn test_relay_unescapes_underscores() {
        let normalizer = Normalizer::default();
        let msg = normalizer
            .normalize(raw("‹**big\\_steve**› hello"), &bot(), Arc::new(NullChannel))
            .unwrap();

        assert_eq!(msg.author_name, "big_steve");
    }

    #[test]
    fn test_plain_message_keeps_author() {
        let normalizer = Normalizer::default();
        let msg = normalizer
            .normalize(raw("  just talking  "), &bot(), Arc::new(NullChannel))
            .unwrap();

        assert_eq!(msg.author_name, "Bob");
        assert_eq!(msg.message_content, "just talking");
        assert!(!msg.contains_self_mention());
    }

    #[test]
    fn test_tagged_user_is_self_mention() {
        let normalizer = Normalizer::default();
        let mut event = raw("@Lex 2 + 2");
        event.mentions.push("999".to_string());
        let msg = normalizer
            .normalize(event, &bot(), Arc::new(NullChannel))
            .unwrap();

        assert!(msg.contains_self_mention());
        assert_eq!(msg.message_content, "2 + 2");
    }

    #[test]
    fn test_literal_name_is_case_insensitive() {
        let normalizer = Normalizer::default();
        let msg = normalizer
            .normalize(raw("hey @lex whos best"), &bot(), Arc::new(NullChannel))
            .unwrap();

        assert!(msg.contains_self_mention());
        assert_eq!(msg.message_content, "hey  whos best");
    }

    #[test]
    fn test_workaround_token() {
        let normalizer = Normalizer::new(Some("<@&123>".to_string()));
        let msg = normalizer
            .normalize(raw("<@&123> hello"), &bot(), Arc::new(NullChannel))
            .unwrap();

        assert!(msg.contains_self_mention());
        assert_eq!(msg.message_content, "hello");
    }

    #[test]
    fn test_own_messages_dropped() {
        let normalizer = Normalizer::default();
        let mut event = raw("echo");
        event.author_id = "999".to_string();

        assert!(normalizer.normalize(event, &bot(), Arc::new(NullChannel)).is_none());
    }
}
