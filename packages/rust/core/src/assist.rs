//! Per-tender assistant actions with a response cache.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use tenderpilot_llm::{AssistTask, LlmClient, Prompt, build_prompt};
use tenderpilot_shared::{ProfileConfig, Result, Tender};
use tenderpilot_storage::Storage;

/// Text produced for one tender.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistOutput {
    /// Which action produced it.
    #[serde(serialize_with = "task_name")]
    pub task: AssistTask,
    /// Model text, verbatim.
    pub text: String,
    /// Model that produced it.
    pub model: String,
    /// Served from the local cache.
    pub cached: bool,
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
}

fn task_name<S: serde::Serializer>(task: &AssistTask, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(task.as_str())
}

/// Compute a prompt hash for cache keying.
fn prompt_hash(task: AssistTask, prompt: &Prompt) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task.as_str().as_bytes());
    hasher.update(prompt.system.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.user.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run `task` for `tender`.
///
/// With a cache and `use_cache`, an identical earlier prompt to the same
/// model is answered from storage. Fresh completions are always written
/// back when a cache is present.
#[instrument(skip_all, fields(task = task.as_str(), row = tender.row, model = client.model()))]
pub async fn assist(
    task: AssistTask,
    tender: &Tender,
    profile: &ProfileConfig,
    client: &dyn LlmClient,
    cache: Option<&Storage>,
    use_cache: bool,
) -> Result<AssistOutput> {
    let prompt = build_prompt(task, tender, profile);
    let hash = prompt_hash(task, &prompt);
    let model = client.model().to_string();

    if let (Some(storage), true) = (cache, use_cache) {
        match storage.get_ai_cache(task.as_str(), &hash, &model).await {
            Ok(Some(text)) => {
                info!("assistant cache hit");
                return Ok(AssistOutput {
                    task,
                    text,
                    model,
                    cached: true,
                    tokens_in: None,
                    tokens_out: None,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "assistant cache lookup failed"),
        }
    }

    let completion = client.complete(&prompt).await?;
    info!(
        latency_ms = completion.latency_ms,
        tokens_out = completion.tokens_out,
        "assistant completion received"
    );

    if let Some(storage) = cache {
        if let Err(e) = storage
            .set_ai_cache(
                task.as_str(),
                &hash,
                &model,
                tender.reference.as_deref(),
                &completion.text,
            )
            .await
        {
            warn!(error = %e, "failed to cache assistant response");
        }
    }

    Ok(AssistOutput {
        task,
        text: completion.text,
        model: completion.model,
        cached: false,
        tokens_in: completion.tokens_in,
        tokens_out: completion.tokens_out,
    })
}
