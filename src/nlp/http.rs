//! HTTP client for an external lemmatization service
//!
//! Expects `POST {base_url}/lemmatize` with `{"text": ...}` to answer
//! `{"lemmas": [...]}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Lemmatizer;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct LemmatizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct LemmatizeResponse {
    lemmas: Vec<String>,
}

/// Lemmatizer backed by an HTTP NLP service
#[derive(Debug, Clone)]
pub struct HttpLemmatizer {
    client: Client,
    base_url: String,
}

impl HttpLemmatizer {
    /// Create a client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Lemmatizer for HttpLemmatizer {
    async fn lemmatize(&self, text: &str) -> Result<Vec<String>> {
        let url = format!("{}/lemmatize", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&LemmatizeRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Nlp(format!("lemmatizer error: {status} - {body}")));
        }

        let parsed: LemmatizeResponse = response.json().await?;
        tracing::trace!(count = parsed.lemmas.len(), "lemmatized text");
        Ok(parsed.lemmas)
    }
}
