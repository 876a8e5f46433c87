//! Length-enforcing retry around a sampling generator

use super::{GenerationRequest, TextGenerator, clean_sample};
use crate::Result;

/// Default attempt budget
pub const DEFAULT_MAX_ATTEMPTS: usize = 30;

/// How hard to try for a usable sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    /// Total generation calls allowed (at least one is always made)
    pub max_attempts: usize,

    /// Minimum accepted length, in characters
    pub min_text_len: usize,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_text_len: 20,
        }
    }
}

/// Re-sample until the cleaned output reaches the minimum length
///
/// Returns as soon as an attempt is long enough. When the budget runs out
/// the longest attempt is returned, which is empty only if every attempt
/// was empty.
///
/// # Errors
///
/// Returns the first generator error
pub async fn sample_until_long_enough(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    policy: SamplingPolicy,
) -> Result<String> {
    let attempts = policy.max_attempts.max(1);
    let mut best = String::new();

    for attempt in 1..=attempts {
        let raw = generator.generate(request).await?;
        let text = clean_sample(&raw, &request.stop);
        let len = text.chars().count();

        if len >= policy.min_text_len {
            tracing::debug!(attempt, len, "sample accepted");
            return Ok(text);
        }

        tracing::trace!(attempt, len, "sample too short, retrying");
        if len > best.chars().count() {
            best = text;
        }
    }

    tracing::debug!(
        attempts,
        len = best.chars().count(),
        "sampling budget exhausted, keeping longest attempt"
    );
    Ok(best)
}
