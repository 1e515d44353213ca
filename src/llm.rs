// src/llm.rs
use crate::config::Config;
use crate::error::{AppError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error, info};
use reqwest::Client;
use serde_json::{json, Value};

/// Text generation backend for the advice flow.
pub trait AdviceModel: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Google Gemini `generateContent` client. Generation settings are left at
/// the provider defaults.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.gemini_base.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        info!("Requesting advice from {} ({} prompt chars)", self.model, prompt.len());

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| truncate(&text, 200).to_string());
            error!("Gemini returned HTTP {}: {}", status, detail);
            return Err(AppError::Model(format!("HTTP {}: {}", status, detail)));
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            error!("Unreadable Gemini response: {}", e);
            AppError::Model(format!("unreadable response: {}", truncate(&text, 200)))
        })?;
        let advice = extract_text(&value)?;
        debug!("Gemini returned {} chars", advice.len());
        Ok(advice)
    }
}

impl AdviceModel for GeminiClient {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        self.generate_content(prompt).boxed()
    }
}

/// Pulls the generated text out of a response body.
///
/// Prefers the multi-part shape (`candidates[0].content.parts[*].text`, first
/// part with text) and falls back to a top-level `text` field.
pub fn extract_text(value: &Value) -> Result<String> {
    if let Some(message) = error_message(value) {
        return Err(AppError::Model(message));
    }

    let from_parts = value["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()));

    if let Some(text) = from_parts.or_else(|| value["text"].as_str()) {
        return Ok(text.to_string());
    }

    if let Some(reason) = value["promptFeedback"]["blockReason"].as_str() {
        return Err(AppError::Model(format!("prompt blocked: {}", reason)));
    }
    if let Some(reason) = value["candidates"][0]["finishReason"].as_str() {
        return Err(AppError::Model(format!(
            "no text in response (finish reason {})",
            reason
        )));
    }
    Err(AppError::Model("no text in response".to_string()))
}

fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    Some(
        error["message"]
            .as_str()
            .unwrap_or("unknown Gemini API error")
            .to_string(),
    )
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
