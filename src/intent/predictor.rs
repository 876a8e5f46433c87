//! Intent predictors
//!
//! A predictor scores a message against one or more intents. Concrete
//! predictors match on content; [`SelfMentionFilter`] wraps any predictor
//! and silences it unless the bot was addressed.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::{Intent, IntentData, IntentPrediction};
use crate::Result;
use crate::message::AuthoredMessage;
use crate::nlp::Lemmatizer;

/// Policy producing scored guesses about a message's intent
#[async_trait]
pub trait IntentPredictor: Send + Sync {
    /// Score the message
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator (e.g. the lemmatizer) fails. The
    /// router treats a failed predictor as having no predictions.
    async fn predict(&self, message: &AuthoredMessage) -> Result<Vec<IntentPrediction>>;
}

/// Combinators available on every predictor
pub trait IntentPredictorExt: IntentPredictor + Sized {
    /// Only predict when the message addresses the bot
    fn requires_self_mention(self) -> SelfMentionFilter<Self> {
        SelfMentionFilter::new(self)
    }
}

impl<P: IntentPredictor + Sized> IntentPredictorExt for P {}

/// Always predicts one intent with a fixed score
#[derive(Debug, Clone)]
pub struct ConstantPredictor {
    intent: Arc<Intent>,
    score: f64,
}

impl ConstantPredictor {
    /// Create a constant predictor
    #[must_use]
    pub const fn new(intent: Arc<Intent>, score: f64) -> Self {
        Self { intent, score }
    }
}

#[async_trait]
impl IntentPredictor for ConstantPredictor {
    async fn predict(&self, _message: &AuthoredMessage) -> Result<Vec<IntentPrediction>> {
        Ok(vec![IntentPrediction::new(
            self.score,
            Arc::clone(&self.intent),
        )])
    }
}

/// Matches the message text against an ordered list of patterns
///
/// Emits one prediction per pattern: score 1 with the capture groups on a
/// match anchored at the start of the text, score 0 otherwise.
#[derive(Debug, Clone)]
pub struct RegexPredictor {
    rules: Vec<(Regex, Arc<Intent>)>,
}

impl RegexPredictor {
    /// Create a predictor from `(pattern, intent)` pairs
    #[must_use]
    pub const fn new(rules: Vec<(Regex, Arc<Intent>)>) -> Self {
        Self { rules }
    }

    /// Number of patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if there are no patterns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Score a piece of text against every pattern
    #[must_use]
    pub fn match_text(&self, text: &str) -> Vec<IntentPrediction> {
        self.rules
            .iter()
            .map(|(pattern, intent)| {
                // Leftmost-first search finds a match at 0 whenever one exists
                match pattern.captures(text) {
                    Some(caps) if caps.get(0).is_some_and(|m| m.start() == 0) => {
                        IntentPrediction::new(1.0, Arc::clone(intent))
                            .with_data(IntentData::from_captures(pattern, &caps))
                    }
                    _ => IntentPrediction::new(0.0, Arc::clone(intent)),
                }
            })
            .collect()
    }
}

#[async_trait]
impl IntentPredictor for RegexPredictor {
    async fn predict(&self, message: &AuthoredMessage) -> Result<Vec<IntentPrediction>> {
        Ok(self.match_text(&message.message_content))
    }
}

/// Like [`RegexPredictor`], but matches the lowercased lemmas of the text
pub struct LemmaRegexPredictor {
    patterns: RegexPredictor,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl LemmaRegexPredictor {
    /// Create a predictor from `(pattern, intent)` pairs
    #[must_use]
    pub fn new(rules: Vec<(Regex, Arc<Intent>)>, lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            patterns: RegexPredictor::new(rules),
            lemmatizer,
        }
    }
}

#[async_trait]
impl IntentPredictor for LemmaRegexPredictor {
    async fn predict(&self, message: &AuthoredMessage) -> Result<Vec<IntentPrediction>> {
        let lemmas = self.lemmatizer.lemmatize(&message.message_content).await?;
        let text = lemmas.join(" ").to_lowercase();
        Ok(self.patterns.match_text(&text))
    }
}

/// Suppresses the wrapped predictor unless the message addresses the bot
#[derive(Debug, Clone)]
pub struct SelfMentionFilter<P> {
    inner: P,
}

impl<P> SelfMentionFilter<P> {
    /// Wrap a predictor
    #[must_use]
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: IntentPredictor> IntentPredictor for SelfMentionFilter<P> {
    async fn predict(&self, message: &AuthoredMessage) -> Result<Vec<IntentPrediction>> {
        if !message.contains_self_mention() {
            return Ok(vec![IntentPrediction::suppressed()]);
        }
        self.inner.predict(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::tests::message;
    use crate::nlp::WhitespaceLemmatizer;

    fn intent(name: &str) -> Arc<Intent> {
        Arc::new(Intent::new(name).in_namespace("test"))
    }

    fn scores(predictions: &[IntentPrediction]) -> Vec<f64> {
        predictions.iter().map(|p| p.score).collect()
    }

    #[tokio::test]
    async fn test_constant_ignores_content() {
        let predictor = ConstantPredictor::new(intent("fallback"), 0.1);

        let out = predictor.predict(&message("anything", false)).await.unwrap();
        assert_eq!(scores(&out), vec![0.1]);
        assert_eq!(out[0].intent.name(), "fallback");
    }

    #[tokio::test]
    async fn test_regex_scores_each_pattern() {
        let predictor = RegexPredictor::new(vec![
            (Regex::new(r"^\d+$").unwrap(), intent("number")),
            (Regex::new(r"^hello (\w+)").unwrap(), intent("greet")),
        ]);

        let out = predictor.predict(&message("hello world", true)).await.unwrap();
        assert_eq!(scores(&out), vec![0.0, 1.0]);
        assert_eq!(out[1].data.groups, vec![Some("world".to_string())]);
        assert!(out[0].data.groups.is_empty());
    }

    #[tokio::test]
    async fn test_regex_match_is_anchored_at_start() {
        let predictor = RegexPredictor::new(vec![(Regex::new("best").unwrap(), intent("best"))]);

        let out = predictor.predict(&message("who is best", true)).await.unwrap();
        assert_eq!(scores(&out), vec![0.0]);

        let out = predictor.predict(&message("best of all", true)).await.unwrap();
        assert_eq!(scores(&out), vec![1.0]);
    }

    #[tokio::test]
    async fn test_lemma_regex_matches_lowercased_lemmas() {
        let predictor = LemmaRegexPredictor::new(
            vec![(Regex::new(r"^whos best").unwrap(), intent("best"))],
            Arc::new(WhitespaceLemmatizer),
        );

        let out = predictor.predict(&message("Whos   BEST here", true)).await.unwrap();
        assert_eq!(scores(&out), vec![1.0]);
    }

    #[tokio::test]
    async fn test_filter_suppresses_without_mention() {
        let predictor = ConstantPredictor::new(intent("fallback"), 0.1).requires_self_mention();

        let out = predictor.predict(&message("hello", false)).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].score.abs() < f64::EPSILON);
        assert!(out[0].intent.is_null());
    }

    #[tokio::test]
    async fn test_filter_is_transparent_with_mention() {
        let inner = RegexPredictor::new(vec![
            (Regex::new(r"^a").unwrap(), intent("a")),
            (Regex::new(r"^b").unwrap(), intent("b")),
        ]);
        let msg = message("abc", true);
        let direct = inner.predict(&msg).await.unwrap();
        let filtered = inner.clone().requires_self_mention().predict(&msg).await.unwrap();

        assert_eq!(scores(&direct), scores(&filtered));
        for (d, f) in direct.iter().zip(&filtered) {
            assert!(Arc::ptr_eq(&d.intent, &f.intent));
            assert_eq!(d.data, f.data);
        }
    }
}
