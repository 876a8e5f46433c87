//! Bot modules
//!
//! Each module contributes intents, their handlers, and the predictors that
//! score them. Modules are selected by name from configuration.

pub mod dialogue;
pub mod mystic;
pub mod qa;

use std::sync::Arc;

use crate::config::Config;
use crate::generation::TextGenerator;
use crate::intent::IntentRegistry;
use crate::nlp::Lemmatizer;
use crate::router::BotModule;
use crate::{Error, Result};

/// Names of every available module
pub const AVAILABLE: &[&str] = &[mystic::NAME, dialogue::NAME, qa::NAME];

/// Shared collaborators handed to modules
#[derive(Clone)]
pub struct ModuleDeps {
    /// Lemmatizer used by lemma-regex predictors
    pub lemmatizer: Arc<dyn Lemmatizer>,

    /// Text generator, required by the dialogue module
    pub generator: Option<Arc<dyn TextGenerator>>,
}

/// Build the modules enabled in `config`, in configured order
///
/// # Errors
///
/// Returns `Error::Config` for an unknown module name, a missing generator or
/// rules file, and `Error::DuplicateIntent` if a module is listed twice
pub fn build_modules(
    config: &Config,
    registry: &mut IntentRegistry,
    deps: &ModuleDeps,
) -> Result<Vec<BotModule>> {
    config
        .modules
        .iter()
        .map(|name| build_module(name, config, registry, deps))
        .collect()
}

fn build_module(
    name: &str,
    config: &Config,
    registry: &mut IntentRegistry,
    deps: &ModuleDeps,
) -> Result<BotModule> {
    match name {
        mystic::NAME => mystic::build(registry, Arc::clone(&deps.lemmatizer)),
        dialogue::NAME => {
            let generator = deps.generator.clone().ok_or_else(|| {
                Error::Config("the dialogue module needs LEX_GENERATION_URL".to_string())
            })?;
            dialogue::build(registry, &config.dialogue, generator)
        }
        qa::NAME => {
            let path = config.qa.rules_path.as_deref().ok_or_else(|| {
                Error::Config("the mystic-qa module needs LEX_QA_RULES".to_string())
            })?;
            let rules = qa::QaRules::load(path)?;
            qa::build(registry, &rules, Arc::clone(&deps.lemmatizer))
        }
        other => Err(Error::Config(format!(
            "unknown module {other:?} (available: {})",
            AVAILABLE.join(", ")
        ))),
    }
}
