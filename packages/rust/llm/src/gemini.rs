//! Google Gemini `generateContent` client.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tenderpilot_shared::{Result, TenderPilotError};
use tracing::{debug, instrument};

use crate::{ClientSettings, Completion, LlmClient, Prompt, api_error};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent<'a>>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u64>,
    #[serde(default)]
    candidates_token_count: Option<u64>,
}

/// Client for `POST {base}/models/{model}:generateContent`.
pub struct GeminiClient {
    http: Client,
    settings: ClientSettings,
}

impl GeminiClient {
    pub(crate) fn new(http: Client, settings: ClientSettings) -> Self {
        Self { http, settings }
    }

    /// Accept both `gemini-1.5-flash` and `models/gemini-1.5-flash`.
    fn model_path(&self) -> &str {
        let model = self.settings.model.trim();
        model.strip_prefix("models/").unwrap_or(model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    #[instrument(skip_all, fields(model = %self.settings.model))]
    async fn complete(&self, prompt: &Prompt) -> Result<Completion> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url,
            self.model_path()
        );

        let system_instruction = (!prompt.system.trim().is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: &prompt.system,
            }],
        });

        let body = GeminiRequest {
            system_instruction,
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: &prompt.user }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TenderPilotError::Ai(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| TenderPilotError::Ai(format!("failed to parse response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TenderPilotError::Ai("response contained no text".into()));
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(latency_ms, chars = text.len(), "completion received");

        let usage = parsed.usage_metadata;
        Ok(Completion {
            text,
            model: self.settings.model.clone(),
            tokens_in: usage.as_ref().and_then(|u| u.prompt_token_count),
            tokens_out: usage.as_ref().and_then(|u| u.candidates_token_count),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: String, model: &str) -> GeminiClient {
        GeminiClient::new(
            Client::new(),
            ClientSettings {
                base_url,
                api_key: "g-test".into(),
                model: model.into(),
                temperature: 0.7,
                max_tokens: 512,
            },
        )
    }

    #[test]
    fn strips_models_prefix() {
        let c = client("http://x".into(), "models/gemini-1.5-pro");
        assert_eq!(c.model_path(), "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn completes_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/models/gemini-1.5-flash:generateContent"))
            .and(wiremock::matchers::header("x-goog-api-key", "g-test"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "sys"}]},
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {"maxOutputTokens": 512}
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Dear "}, {"text": "buyer"}]}}],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3}
            })))
            .mount(&server)
            .await;

        let prompt = Prompt {
            system: "sys".into(),
            user: "hello".into(),
        };
        let out = client(server.uri(), "gemini-1.5-flash")
            .complete(&prompt)
            .await
            .unwrap();
        assert_eq!(out.text, "Dear buyer");
        assert_eq!(out.tokens_in, Some(10));
        assert_eq!(out.tokens_out, Some(3));
    }

    #[tokio::test]
    async fn blocked_response_is_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}),
            ))
            .mount(&server)
            .await;

        let prompt = Prompt {
            system: String::new(),
            user: "hello".into(),
        };
        let err = client(server.uri(), "gemini-1.5-flash")
            .complete(&prompt)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no text"));
    }
}
