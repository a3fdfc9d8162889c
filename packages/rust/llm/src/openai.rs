//! OpenAI chat-completions client (also OpenRouter and other compatible APIs).

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tenderpilot_shared::{Result, TenderPilotError};
use tracing::{debug, instrument};

use crate::{ClientSettings, Completion, LlmClient, Prompt, api_error};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Client for `POST {base}/chat/completions` with bearer auth.
pub struct OpenAiClient {
    http: Client,
    settings: ClientSettings,
}

impl OpenAiClient {
    pub(crate) fn new(http: Client, settings: ClientSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    #[instrument(skip_all, fields(model = %self.settings.model))]
    async fn complete(&self, prompt: &Prompt) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TenderPilotError::Ai(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TenderPilotError::Ai(format!("failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TenderPilotError::Ai("response contained no text".into()))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(latency_ms, chars = text.len(), "completion received");

        Ok(Completion {
            text,
            model: parsed.model.unwrap_or_else(|| self.settings.model.clone()),
            tokens_in: parsed.usage.as_ref().map(|u| u.prompt_tokens),
            tokens_out: parsed.usage.as_ref().map(|u| u.completion_tokens),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: String) -> OpenAiClient {
        OpenAiClient::new(
            Client::new(),
            ClientSettings {
                base_url,
                api_key: "sk-test".into(),
                model: "gpt-4o-mini".into(),
                temperature: 0.2,
                max_tokens: 256,
            },
        )
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "You are a bid consultant.".into(),
            user: "Summarize tender PW-1.".into(),
        }
    }

    #[tokio::test]
    async fn completes_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer sk-test"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "You are a bid consultant."},
                    {"role": "user", "content": "Summarize tender PW-1."}
                ]
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{"message": {"role": "assistant", "content": "1. Price sharply."}}],
                "usage": {"prompt_tokens": 42, "completion_tokens": 7}
            })))
            .mount(&server)
            .await;

        let out = client(server.uri()).complete(&prompt()).await.unwrap();
        assert_eq!(out.text, "1. Price sharply.");
        assert_eq!(out.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(out.tokens_in, Some(42));
        assert_eq!(out.tokens_out, Some(7));
    }

    #[tokio::test]
    async fn surfaces_api_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(401).set_body_string("invalid api key"),
            )
            .mount(&server)
            .await;

        let err = client(server.uri()).complete(&prompt()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid api key"));
    }

    #[tokio::test]
    async fn empty_choices_is_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = client(server.uri()).complete(&prompt()).await.unwrap_err();
        assert!(err.to_string().contains("no text"));
    }
}
