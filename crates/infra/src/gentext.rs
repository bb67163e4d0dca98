//! Generative-text service clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cliphub_ops::notify::{TextGenError, TextGenerator};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    instruction: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// HTTP client for the external generative-text collaborator.
///
/// Posts `{instruction, prompt}` and expects `{text}`. Every failure mode
/// (network, non-2xx, malformed body) surfaces as a `TextGenError`; callers
/// fall back to a deterministic message.
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, instruction: &str, prompt: &str) -> Result<String, TextGenError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                instruction,
                prompt,
            })
            .send()
            .await
            .map_err(|e| TextGenError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TextGenError(format!(
                "generation endpoint returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TextGenError(format!("malformed response: {e}")))?;
        Ok(body.text)
    }
}

/// Canned generator for dev wiring and tests.
#[derive(Debug, Clone)]
pub struct StaticTextGenerator {
    text: String,
}

impl StaticTextGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl TextGenerator for StaticTextGenerator {
    async fn generate(&self, _instruction: &str, _prompt: &str) -> Result<String, TextGenError> {
        Ok(self.text.clone())
    }
}
