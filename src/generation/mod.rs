//! Text generation
//!
//! Generation is delegated to an external sampling model. This module holds
//! the contract plus the control patterns handlers wrap around it: the
//! length-enforcing retry loop, the per-author cooldown gate, and the sliding
//! dialogue window with bounded self-play.

mod cooldown;
mod dialogue;
mod http;
mod sampling;

pub use cooldown::{CooldownDecision, CooldownGate, CooldownScope};
pub use dialogue::{DialogueWindow, SelfPlay, tail_chars};
pub use http::HttpGenerator;
pub use sampling::{DEFAULT_MAX_ATTEMPTS, SamplingPolicy, sample_until_long_enough};

use async_trait::async_trait;

use crate::Result;

/// Marker some models emit at the end of a document
pub const END_OF_TEXT: &str = "<|endoftext|>";

/// A single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Conditioning text the continuation is sampled from
    pub conditioning: String,

    /// Maximum length of the generated continuation, in tokens
    pub max_length: usize,

    /// Token that ends a turn
    pub stop: String,
}

/// Sampling text generator
///
/// Output is non-deterministic; callers must not assume two calls with the
/// same request agree.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation of `request.conditioning`
    ///
    /// # Errors
    ///
    /// Returns `Error::Generation` if the model call fails
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Clean a raw continuation: drop stop tokens and anything after the
/// end-of-text marker, then trim
#[must_use]
pub fn clean_sample(raw: &str, stop: &str) -> String {
    let text = if stop.is_empty() {
        raw.to_string()
    } else {
        raw.replace(stop, "")
    };
    let text = text.find(END_OF_TEXT).map_or(text.as_str(), |idx| &text[..idx]);
    text.trim().to_string()
}
