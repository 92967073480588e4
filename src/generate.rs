//! Answer generation via a local LLM backend.
//!
//! The [`Generator`] trait returns displayable text and never an error:
//! the caller always shows the result to the user, so every backend
//! failure maps to a fixed answer string instead of propagating. The
//! single production implementation, [`OllamaGenerator`], speaks the
//! `/api/generate` protocol of a local Ollama instance.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::prompt::truncate_chars;

/// Answer text when the backend cannot be reached.
pub const BACKEND_DOWN_MESSAGE: &str =
    "Error: the model backend is not running. Start it with 'ollama serve' and try again.";
/// Answer text when the backend exceeds the configured timeout.
pub const BACKEND_TIMEOUT_MESSAGE: &str =
    "Error: the model backend took too long to respond. Try a simpler question.";
/// Answer text when the backend returns blank output.
pub const EMPTY_RESPONSE_MESSAGE: &str = "Unable to generate a response.";

/// Trait for answer generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer for a fully rendered prompt.
    ///
    /// Always returns displayable text; failures come back as fixed
    /// error strings, not as `Err`.
    async fn generate(&self, prompt: &str) -> String;
}

/// Generation backend speaking the Ollama `/api/generate` protocol.
///
/// Sends `{model, prompt, stream: false, temperature, max_output_tokens}`
/// and reads `{response}` from a 200 reply. The prompt is truncated to
/// `max_prompt_chars` before sending and the whole round trip carries the
/// configured timeout, which bounds worst-case answer latency.
pub struct OllamaGenerator {
    url: String,
    model: String,
    temperature: f64,
    max_output_tokens: u32,
    timeout: Duration,
    max_prompt_chars: usize,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig, max_prompt_chars: usize) -> Self {
        Self {
            url: config.url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            max_prompt_chars,
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> String {
        let prompt = truncate_chars(prompt, self.max_prompt_chars);

        let client = match reqwest::Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => return format!("Error generating response: {}", e),
        };

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "temperature": self.temperature,
            "max_output_tokens": self.max_output_tokens,
        });

        let response = match client.post(&self.url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return classify_request_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("generation backend returned status {}", status);
            return format!("Error: the model backend returned status {}.", status.as_u16());
        }

        let json: serde_json::Value = match response.json().await {
            Ok(json) => json,
            Err(e) => return classify_request_error(&e),
        };

        let text = json
            .get("response")
            .and_then(|r| r.as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        if text.is_empty() {
            EMPTY_RESPONSE_MESSAGE.to_string()
        } else {
            text
        }
    }
}

fn classify_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        BACKEND_TIMEOUT_MESSAGE.to_string()
    } else if e.is_connect() {
        BACKEND_DOWN_MESSAGE.to_string()
    } else {
        format!("Error generating response: {}", e)
    }
}
