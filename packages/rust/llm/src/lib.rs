//! Hosted LLM clients and the prompt templates TenderPilot sends them.
//!
//! Two providers are interchangeable behind [`LlmClient`]:
//! - [`OpenAiClient`] — OpenAI chat completions or any compatible endpoint
//! - [`GeminiClient`] — Google Gemini `generateContent`
//!
//! The returned text is passed through untouched; callers display it verbatim.

mod gemini;
mod openai;
pub mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tenderpilot_shared::{AiConfig, AiProvider, Result, TenderPilotError, resolve_api_key};
use tracing::info;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use prompts::{AssistTask, Prompt, build_prompt};

/// User-Agent string for completion requests.
const USER_AGENT: &str = concat!("TenderPilot/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed back from a failed API call.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// One completion returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated text, verbatim.
    pub text: String,
    /// Model that produced it.
    pub model: String,
    /// Prompt tokens, when the provider reports them.
    pub tokens_in: Option<u64>,
    /// Completion tokens, when the provider reports them.
    pub tokens_out: Option<u64>,
    /// Wall-clock time of the request.
    pub latency_ms: u64,
}

/// A hosted text-completion provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model ID requests are sent to.
    fn model(&self) -> &str;

    /// Send one system + user prompt and return the completion.
    async fn complete(&self, prompt: &Prompt) -> Result<Completion>;
}

/// Sampling settings shared by both providers.
#[derive(Debug, Clone)]
pub(crate) struct ClientSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ClientSettings {
    fn from_config(config: &AiConfig, api_key: String) -> Self {
        Self {
            base_url: config.endpoint().to_string(),
            api_key,
            model: config.model_id().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Build the configured provider client, reading its API key from the environment.
pub fn client_from_config(config: &AiConfig) -> Result<Box<dyn LlmClient>> {
    let api_key = resolve_api_key(config)?;
    client_with_key(config, api_key)
}

/// Build the configured provider client with an explicit API key.
pub fn client_with_key(config: &AiConfig, api_key: String) -> Result<Box<dyn LlmClient>> {
    let http = build_http(config.timeout_secs)?;
    let settings = ClientSettings::from_config(config, api_key);

    info!(provider = %config.provider, model = %settings.model, "AI client ready");

    Ok(match config.provider {
        AiProvider::OpenAi => Box::new(OpenAiClient::new(http, settings)),
        AiProvider::Gemini => Box::new(GeminiClient::new(http, settings)),
    })
}

/// Build a reqwest client with appropriate settings.
fn build_http(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TenderPilotError::Ai(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into an [`TenderPilotError::Ai`].
pub(crate) async fn api_error(response: reqwest::Response) -> TenderPilotError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    TenderPilotError::Ai(format!("API error ({status}): {body}"))
}
