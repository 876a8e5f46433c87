//! Mystic module: fallback answer, arithmetic, and "who's best"

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::Result;
use crate::expr;
use crate::intent::{
    AuthorHistory, ConstantPredictor, Intent, IntentData, IntentHandler, IntentPrediction,
    IntentPredictor, IntentPredictorExt, IntentRegistry, LemmaRegexPredictor, RegexPredictor,
    SelfMentionFilter,
};
use crate::message::AuthoredMessage;
use crate::nlp::Lemmatizer;
use crate::router::BotModule;

/// Module name and intent namespace
pub const NAME: &str = "mystic";

/// Score of the fallback intent
pub const UNKNOWN_SCORE: f64 = 0.1;

static MATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\+\-/\* \(\)\^]|\d|\.)+$").expect("math pattern is valid")
});

static WHOS_BEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(who be best|whos best|who be the best|whos the best).*$")
        .expect("whos best pattern is valid")
});

/// Build the module, registering its intents
///
/// # Errors
///
/// Returns `Error::DuplicateIntent` if the module is built twice against
/// the same registry
pub fn build(registry: &mut IntentRegistry, lemmatizer: Arc<dyn Lemmatizer>) -> Result<BotModule> {
    let mut module = BotModule::new(NAME);

    let unknown = module.register_intent(registry, Intent::new("unknown"))?;
    unknown.register_handler(Arc::new(UnknownHandler));
    module.register_predictor(
        ConstantPredictor::new(Arc::clone(&unknown), UNKNOWN_SCORE).requires_self_mention(),
    );

    let math = module.register_intent(registry, Intent::new("math"))?;
    math.register_handler(Arc::new(MathHandler));
    module.register_predictor(
        RegexPredictor::new(vec![(MATH_PATTERN.clone(), Arc::clone(&math))])
            .requires_self_mention(),
    );

    let history = Arc::new(AuthorHistory::default());
    let whos_best = module.register_intent(registry, Intent::new("whosbest"))?;
    whos_best.register_handler(Arc::new(WhosBestHandler {
        history: Arc::clone(&history),
    }));
    module.register_predictor(WhosBestPredictor {
        history,
        inner: LemmaRegexPredictor::new(
            vec![(WHOS_BEST_PATTERN.clone(), whos_best)],
            lemmatizer,
        )
        .requires_self_mention(),
    });

    Ok(module)
}

/// Replies that the question was not understood
struct UnknownHandler;

#[async_trait]
impl IntentHandler for UnknownHandler {
    async fn handle(&self, message: &mut AuthoredMessage, _data: &IntentData) -> Result<()> {
        message
            .reply(format!(
                "I don't know how to answer that, {}.",
                message.author_name
            ))
            .await
    }
}

/// Evaluates the message as an arithmetic expression
struct MathHandler;

#[async_trait]
impl IntentHandler for MathHandler {
    async fn handle(&self, message: &mut AuthoredMessage, _data: &IntentData) -> Result<()> {
        let reply = match expr::evaluate(&message.message_content) {
            Ok(value) => format!("Answer: {}", expr::format_significant(value, 5)),
            Err(e) => {
                tracing::debug!(error = %e, "expression rejected");
                format!(
                    "I can't evaluate that expression, {}.",
                    message.author_name
                )
            }
        };
        message.reply(reply).await
    }
}

/// Records every author it sees, then predicts only when addressed
struct WhosBestPredictor {
    history: Arc<AuthorHistory>,
    inner: SelfMentionFilter<LemmaRegexPredictor>,
}

#[async_trait]
impl IntentPredictor for WhosBestPredictor {
    async fn predict(&self, message: &AuthoredMessage) -> Result<Vec<IntentPrediction>> {
        self.history.record(&message.author_name);
        self.inner.predict(message).await
    }
}

/// Names the recent author with the greatest history key
struct WhosBestHandler {
    history: Arc<AuthorHistory>,
}

#[async_trait]
impl IntentHandler for WhosBestHandler {
    async fn handle(&self, message: &mut AuthoredMessage, _data: &IntentData) -> Result<()> {
        let best = self
            .history
            .best()
            .unwrap_or_else(|| message.author_name.clone());
        message.reply(format!("{best} is the best.")).await
    }
}
