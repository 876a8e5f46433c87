//! Intents and their handlers
//!
//! An [`Intent`] is a named unit of meaning owned by a bot module. Predictors
//! score messages against intents; the router dispatches the winning
//! prediction to the intent's handlers, in registration order.

mod history;
mod predictor;
mod registry;

pub use history::{AUTHOR_HISTORY_CAPACITY, AuthorHistory, RollingHistory};
pub use predictor::{
    ConstantPredictor, IntentPredictor, IntentPredictorExt, LemmaRegexPredictor,
    RegexPredictor, SelfMentionFilter,
};
pub use registry::IntentRegistry;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use async_trait::async_trait;
use regex::{Captures, Regex};

use crate::Result;
use crate::message::AuthoredMessage;

/// Sentinel intent returned by gated predictors; never dispatched
static NULL_INTENT: LazyLock<Arc<Intent>> = LazyLock::new(|| Arc::new(Intent::new("null")));

/// Something that reacts to a dispatched intent
///
/// Handlers run sequentially; a handler may rewrite the message and later
/// handlers of the same intent observe the change.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    /// Handle a message predicted to carry this intent
    async fn handle(&self, message: &mut AuthoredMessage, data: &IntentData) -> Result<()>;
}

/// Data extracted by a predictor, passed through to handlers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentData {
    /// Positional capture groups, group 0 excluded
    pub groups: Vec<Option<String>>,

    /// Named capture groups that participated in the match
    pub named: HashMap<String, String>,
}

impl IntentData {
    /// Collect the capture groups of a regex match
    #[must_use]
    pub fn from_captures(pattern: &Regex, caps: &Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = pattern
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();

        Self { groups, named }
    }
}

/// A named, namespaced unit of meaning
pub struct Intent {
    namespace: String,
    name: String,
    handlers: RwLock<Vec<Arc<dyn IntentHandler>>>,
}

impl Intent {
    /// Create an intent with no namespace yet
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// The sentinel intent used for suppressed predictions
    #[must_use]
    pub fn null() -> Arc<Self> {
        Arc::clone(&NULL_INTENT)
    }

    /// Check if this is the sentinel intent
    #[must_use]
    pub fn is_null(self: &Arc<Self>) -> bool {
        Arc::ptr_eq(self, &NULL_INTENT)
    }

    /// Set the owning module's namespace
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Intent name within its namespace
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning module's namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fully-qualified name, `namespace:name`
    #[must_use]
    pub fn fq_name(&self) -> String {
        format!("{}:{}", self.namespace, self.name)
    }

    /// Append a handler
    pub fn register_handler(&self, handler: Arc<dyn IntentHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Number of registered handlers
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run every handler in registration order
    ///
    /// # Errors
    ///
    /// Returns the first handler error; remaining handlers are skipped
    pub async fn handle(&self, message: &mut AuthoredMessage, data: &IntentData) -> Result<()> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for handler in handlers {
            handler.handle(message, data).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intent")
            .field("fq_name", &self.fq_name())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// A scored guess that a message carries an intent
#[derive(Debug, Clone)]
pub struct IntentPrediction {
    /// Relevance, conventionally in `[0, 1]`
    pub score: f64,

    /// Predicted intent
    pub intent: Arc<Intent>,

    /// Extracted data for the handler
    pub data: IntentData,
}

impl IntentPrediction {
    /// Create a prediction without extracted data
    #[must_use]
    pub fn new(score: f64, intent: Arc<Intent>) -> Self {
        Self {
            score,
            intent,
            data: IntentData::default(),
        }
    }

    /// Attach extracted data
    #[must_use]
    pub fn with_data(mut self, data: IntentData) -> Self {
        self.data = data;
        self
    }

    /// The zero-score prediction against the sentinel intent
    #[must_use]
    pub fn suppressed() -> Self {
        Self::new(0.0, Intent::null())
    }
}
