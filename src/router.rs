//! Arbitration engine
//!
//! The router owns the intent registry and every bot module. For each inbound
//! message it asks all predictors of all modules for predictions, keeps the
//! single best one, and dispatches it if its score is positive.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;
use crate::channels::{Channel, InboundMessage};
use crate::intent::{Intent, IntentPrediction, IntentPredictor, IntentRegistry};
use crate::message::{AuthoredMessage, Normalizer};

/// A named group of intents and the predictors that score them
pub struct BotModule {
    name: String,
    intents: Vec<Arc<Intent>>,
    predictors: Vec<Box<dyn IntentPredictor>>,
}

impl BotModule {
    /// Create an empty module
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intents: Vec::new(),
            predictors: Vec::new(),
        }
    }

    /// Module name, used as the namespace of its intents
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stamp the module namespace onto `intent` and register it
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateIntent` if the fully-qualified name is taken
    pub fn register_intent(
        &mut self,
        registry: &mut IntentRegistry,
        intent: Intent,
    ) -> Result<Arc<Intent>> {
        let intent = Arc::new(intent.in_namespace(self.name.clone()));
        registry.register(Arc::clone(&intent))?;
        self.intents.push(Arc::clone(&intent));
        Ok(intent)
    }

    /// Add a predictor
    pub fn register_predictor(&mut self, predictor: impl IntentPredictor + 'static) {
        self.predictors.push(Box::new(predictor));
    }

    /// Intents owned by this module, in registration order
    #[must_use]
    pub fn intents(&self) -> &[Arc<Intent>] {
        &self.intents
    }

    /// Number of predictors
    #[must_use]
    pub fn predictor_count(&self) -> usize {
        self.predictors.len()
    }
}

impl std::fmt::Debug for BotModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotModule")
            .field("name", &self.name)
            .field("intents", &self.intents.len())
            .field("predictors", &self.predictors.len())
            .finish()
    }
}

/// Routes normalized messages to the best-scoring intent
#[derive(Debug, Default)]
pub struct Router {
    registry: IntentRegistry,
    modules: Vec<BotModule>,
    normalizer: Normalizer,
}

impl Router {
    /// Create a router with an empty registry
    #[must_use]
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            registry: IntentRegistry::new(),
            modules: Vec::new(),
            normalizer,
        }
    }

    /// Registry of every intent known to this router
    #[must_use]
    pub const fn registry(&self) -> &IntentRegistry {
        &self.registry
    }

    /// Mutable registry, for module construction
    pub const fn registry_mut(&mut self) -> &mut IntentRegistry {
        &mut self.registry
    }

    /// Add a module; its predictors take part in arbitration from now on
    pub fn add_module(&mut self, module: BotModule) {
        tracing::info!(
            module = module.name(),
            intents = module.intents().len(),
            predictors = module.predictor_count(),
            "module loaded"
        );
        self.modules.push(module);
    }

    /// Loaded modules, in arbitration order
    #[must_use]
    pub fn modules(&self) -> &[BotModule] {
        &self.modules
    }

    /// Collect the predictions of every predictor, in module order
    ///
    /// A failing predictor contributes nothing.
    pub async fn predict_all(&self, message: &AuthoredMessage) -> Vec<IntentPrediction> {
        let mut predictions = Vec::new();
        for module in &self.modules {
            for predictor in &module.predictors {
                match predictor.predict(message).await {
                    Ok(mut found) => predictions.append(&mut found),
                    Err(e) => {
                        tracing::warn!(
                            module = module.name(),
                            error = %e,
                            "predictor failed, ignoring"
                        );
                    }
                }
            }
        }
        predictions
    }

    /// The highest-scoring prediction; the first one seen wins a tie
    ///
    /// Returns `None` when there are no predictions at all.
    pub async fn arbitrate(&self, message: &AuthoredMessage) -> Option<IntentPrediction> {
        select_best(self.predict_all(message).await)
    }

    /// Arbitrate and run the winner's handlers
    ///
    /// Returns the winning prediction if it was dispatched. Handler errors are
    /// logged here and never reach the caller.
    pub async fn dispatch(&self, mut message: AuthoredMessage) -> Option<IntentPrediction> {
        let best = self.arbitrate(&message).await?;

        if best.score <= 0.0 || best.intent.is_null() {
            tracing::debug!(score = best.score, "no intent above threshold");
            return None;
        }

        let fq_name = best.intent.fq_name();
        tracing::debug!(intent = %fq_name, score = best.score, "dispatching");

        if let Err(e) = best.intent.handle(&mut message, &best.data).await {
            tracing::error!(intent = %fq_name, error = %e, "handler failed");
        }
        Some(best)
    }

    /// Normalize a raw event and dispatch it
    pub async fn handle_inbound(&self, raw: InboundMessage, channel: &Arc<dyn Channel>) {
        let Some(bot) = channel.identity() else {
            tracing::debug!(channel = channel.name(), "identity not known yet, dropping message");
            return;
        };

        let Some(message) = self.normalizer.normalize(raw, &bot, Arc::clone(channel)) else {
            return;
        };

        tracing::info!(
            author = %message.author_name,
            content = %message.message_content,
            self_mention = message.contains_self_mention(),
            "message"
        );
        self.dispatch(message).await;
    }

    /// Process inbound events in arrival order until the transport closes
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundMessage>, channel: Arc<dyn Channel>) {
        tracing::info!(channel = channel.name(), "router started");

        while let Some(raw) = rx.recv().await {
            self.handle_inbound(raw, &channel).await;
        }

        tracing::info!(channel = channel.name(), "inbound stream closed");
    }
}

/// Stable maximum by score; NaN scores never win
fn select_best(predictions: Vec<IntentPrediction>) -> Option<IntentPrediction> {
    let mut best: Option<IntentPrediction> = None;
    for prediction in predictions {
        if prediction.score.is_nan() {
            continue;
        }
        match &best {
            Some(current) if prediction.score <= current.score => {}
            _ => best = Some(prediction),
        }
    }
    best
}
