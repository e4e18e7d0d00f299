//! Draft generation.
//!
//! `TextGenerator` is the seam to the text-generation service: prompt in,
//! completion out. `RigGenerator` talks to any OpenAI-compatible endpoint
//! through rig; `DraftGenerator` builds the initial / refine instruction from
//! the session and installs the completion as the new draft.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::{debug, info, warn};

use crate::config::DraftConfig;
use crate::errors::GenerationError;
use crate::observer::{with_progress, Activity, LoopObserver, DEFAULT_TICK};
use crate::prompts;
use crate::session::{Draft, Session};

/// Text-generation collaborator.
///
/// Errors are returned to the caller untouched; implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Rig-backed generator for OpenAI-compatible endpoints.
///
/// Waits as long as the endpoint takes; wrap it in a `TimeoutGenerator` to
/// bound each request.
pub struct RigGenerator {
    client: openai::CompletionsClient,
    model: String,
    temperature: f64,
}

impl RigGenerator {
    pub fn new(config: &DraftConfig) -> Result<Self, GenerationError> {
        Ok(Self {
            client: config.completion_client()?,
            model: config.endpoint.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Share this generator, bounded by the configured request timeout if any.
    pub fn into_shared(self, timeout: Option<Duration>) -> Arc<dyn TextGenerator> {
        match timeout {
            Some(limit) => Arc::new(TimeoutGenerator::new(self, limit)),
            None => Arc::new(self),
        }
    }
}

#[async_trait]
impl TextGenerator for RigGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(prompts::WRITER_PREAMBLE)
            .temperature(self.temperature)
            .build();

        debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            prompt_version = prompts::PROMPT_VERSION,
            "requesting completion"
        );

        let response = agent
            .prompt(prompt)
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        require_text(response)
    }
}

/// A whitespace-only completion is a malformed response, not a draft.
fn require_text(response: String) -> Result<String, GenerationError> {
    if response.trim().is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    Ok(response)
}

/// Fails any request that takes longer than `limit` with `GenerationError::Timeout`.
pub struct TimeoutGenerator<G> {
    inner: G,
    limit: Duration,
}

impl<G: TextGenerator> TimeoutGenerator<G> {
    pub fn new(inner: G, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for TimeoutGenerator<G> {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.limit, self.inner.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(limit_secs = self.limit.as_secs_f64(), "completion timed out");
                Err(GenerationError::Timeout(self.limit))
            }
        }
    }
}

/// Produces a fresh draft or refines the current one.
pub struct DraftGenerator {
    backend: Arc<dyn TextGenerator>,
    observer: Arc<dyn LoopObserver>,
    tick: Duration,
}

impl DraftGenerator {
    pub fn new(backend: Arc<dyn TextGenerator>, observer: Arc<dyn LoopObserver>) -> Self {
        Self {
            backend,
            observer,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Replace `session.draft` with a new completion.
    ///
    /// With no draft yet the instruction is built from the topic; otherwise the
    /// whole current draft is sent back for refinement. On error the session
    /// is left untouched.
    pub async fn generate(&self, session: &mut Session) -> Result<(), GenerationError> {
        let prompt = match session.draft_text() {
            None => prompts::initial(session.topic()),
            Some(draft) => prompts::refine(draft),
        };
        let refining = session.draft.is_some();

        let text = with_progress(
            self.observer.as_ref(),
            Activity::Generating,
            self.tick,
            self.backend.complete(&prompt),
        )
        .await?;

        session.replace_draft(Draft::generated(text));
        info!(
            topic = %session.topic(),
            refining,
            revision = session.draft.as_ref().map_or(0, |d| d.revision),
            "draft generated"
        );
        Ok(())
    }
}
