//! Runtime configuration for the drafting loop.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`DRAFT_LOOP_*`, `GOOGLE_API_KEY`)
//! 3. TOML config file passed with `--config`
//! 4. Built-in defaults (Gemini through Google's OpenAI-compatible endpoint)
//!
//! The config is built once and handed to the generator at construction;
//! nothing here is process-global.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{DraftLoopError, GenerationError};
use crate::state_machine::DEFAULT_MAX_LOGGED_TRANSITIONS;

/// Google's OpenAI-compatible Gemini endpoint.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_TEMPERATURE: f64 = 0.5;

const ENV_BASE_URL: &str = "DRAFT_LOOP_BASE_URL";
const ENV_MODEL: &str = "DRAFT_LOOP_MODEL";
const ENV_API_KEY: &str = "DRAFT_LOOP_API_KEY";
const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
const ENV_OUTPUT_DIR: &str = "DRAFT_LOOP_OUTPUT_DIR";

/// Text-generation endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// API key. Local servers accept anything, so a missing key is not fatal.
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Top-level configuration for one drafting session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    pub endpoint: EndpointConfig,
    /// Sampling temperature for every generation call.
    pub temperature: f64,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Directory the final record is written to.
    pub output_dir: PathBuf,
    /// Print the "Generating response..." ticker while waiting on completions.
    pub show_progress: bool,
    /// Transition records kept in memory for the end-of-run summary.
    pub max_logged_transitions: usize,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: None,
            output_dir: PathBuf::from("."),
            show_progress: true,
            max_logged_transitions: DEFAULT_MAX_LOGGED_TRANSITIONS,
        }
    }
}

impl DraftConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Read a TOML file, then overlay environment variables.
    ///
    /// `None` starts from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, DraftLoopError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    DraftLoopError::Configuration(format!(
                        "failed to read {}: {e}",
                        path.display()
                    ))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, DraftLoopError> {
        toml::from_str(raw)
            .map_err(|e| DraftLoopError::Configuration(format!("invalid config file: {e}")))
    }

    fn apply_env(&mut self) {
        self.apply_env_from(|name| env::var(name).ok());
    }

    /// Overlay variables looked up through `get`.
    ///
    /// `DRAFT_LOOP_API_KEY` takes precedence over `GOOGLE_API_KEY`.
    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get(ENV_BASE_URL) {
            self.endpoint.base_url = url;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.endpoint.model = model;
        }
        if let Some(key) = get(ENV_API_KEY).or_else(|| get(ENV_GOOGLE_API_KEY)) {
            self.endpoint.api_key = Some(key);
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.endpoint
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Validate; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.base_url.trim().is_empty() {
            return Err("endpoint.base_url must not be empty".to_string());
        }
        if self.endpoint.model.trim().is_empty() {
            return Err("endpoint.model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be in [0, 2], got {}",
                self.temperature
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err("request_timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    /// Build a Rig OpenAI-compatible client for the configured endpoint.
    pub fn completion_client(
        &self,
    ) -> Result<rig::providers::openai::CompletionsClient, GenerationError> {
        let api_key = self.endpoint.api_key.as_deref().unwrap_or("not-needed");
        rig::providers::openai::CompletionsClient::builder()
            .api_key(api_key)
            .base_url(&self.endpoint.base_url)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))
    }
}

/// Check if an inference endpoint is reachable (GET /models).
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success() || resp.status().as_u16() == 401,
        Err(_) => false,
    }
}
