//! Dialogue module: persona chat backed by a sampling generator
//!
//! The bot keeps one shared conversation window. Each addressed message is
//! appended as a turn by the human side, the generator continues as the
//! target persona, and the two personas may then keep talking to each other
//! for a few more turns.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::config::DialogueConfig;
use crate::generation::{
    CooldownDecision, CooldownGate, DialogueWindow, GenerationRequest, TextGenerator,
    sample_until_long_enough, tail_chars,
};
use crate::intent::{
    ConstantPredictor, Intent, IntentData, IntentHandler, IntentPredictorExt, IntentRegistry,
};
use crate::message::AuthoredMessage;
use crate::router::BotModule;
use crate::Result;

/// Module name and intent namespace
pub const NAME: &str = "dialogue";

/// Score of the dialogue intent
pub const DIALOGUE_SCORE: f64 = 0.5;

/// Stands in for the author's name inside the conversation
pub const AUTHOR_PLACEHOLDER: &str = "{0}";

/// Build the module, registering its intent
///
/// # Errors
///
/// Returns `Error::DuplicateIntent` if the module is built twice against
/// the same registry
pub fn build(
    registry: &mut IntentRegistry,
    config: &DialogueConfig,
    generator: Arc<dyn TextGenerator>,
) -> Result<BotModule> {
    let mut module = BotModule::new(NAME);

    let dialogue = module.register_intent(registry, Intent::new("dialogue"))?;
    dialogue.register_handler(Arc::new(DialogueHandler::new(config.clone(), generator)));
    module.register_predictor(
        ConstantPredictor::new(dialogue, DIALOGUE_SCORE).requires_self_mention(),
    );

    Ok(module)
}

/// Generates persona replies for addressed messages
pub struct DialogueHandler {
    config: DialogueConfig,
    generator: Arc<dyn TextGenerator>,
    gate: CooldownGate,
    window: Mutex<DialogueWindow>,
}

impl DialogueHandler {
    /// Create a handler with an empty conversation window
    #[must_use]
    pub fn new(config: DialogueConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let gate = CooldownGate::new(config.cooldown, config.cooldown_scope())
            .with_channel_overrides(config.channel_cooldowns.clone());
        let window = Mutex::new(DialogueWindow::new(config.window_size, config.separator()));
        Self {
            config,
            generator,
            gate,
            window,
        }
    }

    /// Snapshot of the conversation turns
    #[must_use]
    pub fn turns(&self) -> Vec<(String, String)> {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .turns()
            .cloned()
            .collect()
    }

    fn push_turn(&self, speaker: &str, text: &str) {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(speaker, text);
    }

    fn conditioning(&self, next_speaker: &str) -> String {
        let full = self
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .conditioning(next_speaker);
        tail_chars(&full, self.config.max_conditioning_chars).to_string()
    }

    /// Sample the next turn for `speaker`
    async fn next_turn(&self, speaker: &str) -> Result<String> {
        let request = GenerationRequest {
            conditioning: self.conditioning(speaker),
            max_length: self.config.max_length,
            stop: self.config.stop_token.clone(),
        };
        tracing::debug!(conditioning = %request.conditioning, "generating");

        sample_until_long_enough(self.generator.as_ref(), &request, self.config.sampling).await
    }

    /// Rewrite the incoming text as a turn by the human side
    fn incoming_turn(&self, content: &str, author: &str) -> String {
        let text = if author.is_empty() {
            content.to_string()
        } else {
            content.replace(author, AUTHOR_PLACEHOLDER)
        };
        if self.config.capitalize {
            capitalize_first(&text)
        } else {
            text
        }
    }
}

#[async_trait]
impl IntentHandler for DialogueHandler {
    async fn handle(&self, message: &mut AuthoredMessage, _data: &IntentData) -> Result<()> {
        let author = message.author_name.clone();

        match self.gate.check(&author, &message.origin.channel_id) {
            CooldownDecision::Proceed => {}
            CooldownDecision::Notify { remaining } => {
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                return message
                    .reply(format!("Please wait {secs}s before asking again, {author}."))
                    .await;
            }
            CooldownDecision::Suppress => {
                tracing::debug!(author = %author, "cooldown notice already sent");
                return Ok(());
            }
        }

        let selfname = self.config.selfname.clone();
        let target = self.config.target.clone();

        let text = self.incoming_turn(&message.message_content, &author);
        self.push_turn(&selfname, &text);

        let reply = self.next_turn(&target).await?;
        message
            .reply(reply.replace(AUTHOR_PLACEHOLDER, &author))
            .await?;
        self.push_turn(&target, &reply);

        let mut extra_turns = 0;
        loop {
            let play = self
                .config
                .self_play
                .continues(extra_turns, &mut rand::thread_rng());
            if !play {
                break;
            }

            let speaker = if extra_turns % 2 == 0 { &selfname } else { &target };
            let turn = self.next_turn(speaker).await?;
            self.push_turn(speaker, &turn);

            let shown_speaker = speaker.replace(AUTHOR_PLACEHOLDER, &author);
            message
                .reply(format!(
                    "<{shown_speaker}> {}",
                    turn.replace(AUTHOR_PLACEHOLDER, &author)
                ))
                .await?;
            extra_turns += 1;
        }

        if extra_turns > 0 {
            tracing::debug!(turns = extra_turns, "self-play finished");
        }
        Ok(())
    }
}

/// Uppercase the first character and lowercase the rest
fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect()
    })
}
