//! Question-answering module driven by a rules file
//!
//! ```toml
//! [entities]
//! bot = "(lex|the bot)"
//!
//! [[responses]]
//! name = "creator"
//! response = "{author}, I was made by the mystic guild."
//! rules = ["^who make {bot}", "^who be {bot} creator"]
//! ```
//!
//! `{entity}` references in rules are expanded before compiling; rules match
//! case-insensitively against the lemmatized message. Templates may use
//! `{author}` and the rule's named capture groups.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::intent::{Intent, IntentData, IntentHandler, IntentRegistry, LemmaRegexPredictor};
use crate::message::AuthoredMessage;
use crate::nlp::Lemmatizer;
use crate::router::BotModule;
use crate::{Error, Result};

/// Module name and intent namespace
pub const NAME: &str = "mystic-qa";

/// Parsed rules file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QaRules {
    /// Reusable pattern fragments, referenced from rules as `{name}`
    #[serde(default)]
    pub entities: HashMap<String, String>,

    /// One intent per response
    #[serde(default)]
    pub responses: Vec<QaResponse>,
}

/// A canned response and the rules that trigger it
#[derive(Debug, Clone, Deserialize)]
pub struct QaResponse {
    /// Intent name
    pub name: String,

    /// Reply template
    pub response: String,

    /// Patterns that select this response
    #[serde(default)]
    pub rules: Vec<String>,
}

impl QaRules {
    /// Parse rules from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Error::Toml` if the text is not a valid rules file
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a rules file
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let rules = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            responses = rules.responses.len(),
            "loaded qa rules"
        );
        Ok(rules)
    }

    /// Expand entity references in a rule and compile it
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if the expanded rule is not a valid pattern
    pub fn compile_rule(&self, rule: &str) -> Result<Regex> {
        let expanded = fill_template(rule, &self.entities);
        Ok(RegexBuilder::new(&expanded).case_insensitive(true).build()?)
    }
}

/// Build the module from parsed rules
///
/// # Errors
///
/// Returns error if a rule fails to compile or two responses share a name
pub fn build(
    registry: &mut IntentRegistry,
    rules: &QaRules,
    lemmatizer: Arc<dyn Lemmatizer>,
) -> Result<BotModule> {
    let mut module = BotModule::new(NAME);
    let mut matchers = Vec::new();

    for response in &rules.responses {
        if response.rules.is_empty() {
            tracing::warn!(response = %response.name, "qa response has no rules");
        }

        let intent = module.register_intent(registry, Intent::new(response.name.clone()))?;
        intent.register_handler(Arc::new(Answerer {
            template: response.response.clone(),
        }));

        for rule in &response.rules {
            let pattern = rules.compile_rule(rule).map_err(|e| {
                Error::Config(format!("qa rule {rule:?} of {}: {e}", response.name))
            })?;
            matchers.push((pattern, Arc::clone(&intent)));
        }
    }

    module.register_predictor(LemmaRegexPredictor::new(matchers, lemmatizer));
    Ok(module)
}

/// Replies with a filled-in template
struct Answerer {
    template: String,
}

#[async_trait]
impl IntentHandler for Answerer {
    async fn handle(&self, message: &mut AuthoredMessage, data: &IntentData) -> Result<()> {
        let mut values = data.named.clone();
        values.insert("author".to_string(), message.author_name.clone());
        message.reply(fill_template(&self.template, &values)).await
    }
}

/// Replace every `{key}` with its value; unknown keys are left as they are
fn fill_template(template: &str, values: &HashMap<String, String>) -> String {
    values.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}
