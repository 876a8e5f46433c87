//! HTTP client for an external text generation service
//!
//! Expects `POST {base_url}/generate` with the request body below to answer
//! `{"text": "..."}` holding only the continuation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationRequest, TextGenerator};
use crate::{Error, Result};

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    max_length: usize,
    stop: &'a str,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Generator backed by an HTTP inference service
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: Client,
    base_url: String,
    model: Option<String>,
}

impl HttpGenerator {
    /// Create a client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/generate", self.base_url);
        let body = GenerateBody {
            model: self.model.as_deref(),
            prompt: &request.conditioning,
            max_length: request.max_length,
            stop: &request.stop,
            do_sample: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "generation service error: {status} - {body}"
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text)
    }
}
