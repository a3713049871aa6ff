//! Minimal chat-completions client shared by the oracle implementations.

use std::time::Duration;

use serde::Deserialize;

use crate::config::OpenAiSettings;

#[derive(Clone)]
pub(super) struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatClient {
    pub(super) fn new(settings: &OpenAiSettings) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    /// One system+user exchange at temperature 0; returns the assistant's
    /// text, trimmed.
    pub(super) async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, String> {
        let body = serde_json::json!({
            "model": model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(format!("chat request failed ({}): {}", status, message));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| e.to_string())?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| "No choices in response".to_string())?;

        Ok(content.trim().to_string())
    }
}
