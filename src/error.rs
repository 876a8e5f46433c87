//! Error types for the Lex bot

use thiserror::Error;

/// Result type alias for Lex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lex bot
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An intent with the same fully-qualified name is already registered
    #[error("duplicate intent: {0}")]
    DuplicateIntent(String),

    /// Intent lookup failed
    #[error("intent not found: {0}")]
    IntentNotFound(String),

    /// Channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// Lemmatizer error
    #[error("nlp error: {0}")]
    Nlp(String),

    /// Text generation error
    #[error("generation error: {0}")]
    Generation(String),

    /// Arithmetic expression could not be evaluated
    #[error("expression error: {0}")]
    Expression(String),

    /// Handler failure not covered by a more specific variant
    #[error("handler error: {0}")]
    Handler(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid regex pattern
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}
