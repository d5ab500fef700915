use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};

/// Boundary to the external generative model. Returns the model's raw text;
/// interpretation belongs to the response parser.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            temperature: config.gemini_temperature,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json"
            }
        });

        let started = Instant::now();
        let res = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                // the url carries the api key
                let e = e.without_url();
                let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
                tracing::error!(model = %self.model, error = %e, "Gemini {}", reason);
                Error::GenerationBackend(format!("Gemini {}: {}", reason, e))
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!(%status, body = %crate::error::excerpt(&text), "Gemini API error");
            return Err(Error::GenerationBackend(format!(
                "Gemini API returned {}",
                status
            )));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| Error::GenerationBackend(format!("unreadable Gemini response: {}", e)))?;

        let text = extract_candidate_text(&body).ok_or_else(|| {
            let reason = body
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidate text");
            Error::GenerationBackend(format!("Gemini returned no content ({})", reason))
        })?;

        tracing::info!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_chars = text.chars().count(),
            "Gemini response received"
        );
        Ok(text)
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_candidate_text(body: &JsonValue) -> Option<String> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidate_text_parts_are_joined() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "[{\"a\":" }, { "text": "1}]" } ] } }
            ]
        });
        assert_eq!(extract_candidate_text(&body).as_deref(), Some("[{\"a\":1}]"));
    }

    #[test]
    fn blocked_or_empty_responses_have_no_text() {
        assert_eq!(extract_candidate_text(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })), None);
        let empty = json!({ "candidates": [ { "content": { "parts": [ { "text": "  " } ] } } ] });
        assert_eq!(extract_candidate_text(&empty), None);
    }
}
