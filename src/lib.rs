//! Lex - Intent routing chat bot
//!
//! This library provides the core of the Lex bot:
//! - Message normalization (relay authors, self-mention detection)
//! - Intents, predictors, and the arbitration engine
//! - Generation control for model-backed handlers
//! - The bundled bot modules
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Transports                        │
//! │            Discord        │        Console           │
//! └────────────────────┬────────────────────────────────┘
//!                      │ InboundMessage
//! ┌────────────────────▼────────────────────────────────┐
//! │                      Router                          │
//! │  Normalizer → Predictors (per module) → Arbitration  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ winning IntentPrediction
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Intent handlers                      │
//! │   mystic  │  dialogue (generation)  │  mystic-qa     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod config;
pub mod error;
pub mod expr;
pub mod generation;
pub mod intent;
pub mod message;
pub mod modules;
pub mod nlp;
pub mod router;

pub use channels::{BotIdentity, Channel, InboundMessage, OutgoingMessage};
pub use config::Config;
pub use error::{Error, Result};
pub use intent::{
    Intent, IntentData, IntentHandler, IntentPrediction, IntentPredictor, IntentPredictorExt,
    IntentRegistry,
};
pub use message::{AuthoredMessage, MessageAttributes, Normalizer};
pub use router::{BotModule, Router};
