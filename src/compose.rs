//! # Compose Module
//!
//! Turns research text into a concise, stakeholder-friendly email by
//! prompting a hosted LLM.
//!
//! Unlike the search layer, failures here are *not* swallowed: composing an
//! email with no model behind it is not a recoverable condition, so every
//! error propagates to the caller as a [`ComposeError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// =============================================================================
// ERRORS
// =============================================================================
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("network error calling the model: {0}")]
    Network(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("model returned no candidates")]
    EmptyResponse,
}

// =============================================================================
// MODEL OUTPUT SHAPES
// =============================================================================
/// The two shapes a model-invocation layer may hand back: a raw string, or
/// a structured result keyed by `"text"`.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    PlainText(String),
    Structured(Map<String, Value>),
}

/// Extract trimmed plaintext from either output shape. A structured result
/// without a string under `"text"` yields the empty string.
pub fn extract_text(output: ModelOutput) -> String {
    match output {
        ModelOutput::PlainText(text) => text.trim().to_string(),
        ModelOutput::Structured(map) => map
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string(),
    }
}

/// A hosted completion model behind a uniform prompt→output interface.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<ModelOutput, ComposeError>;
}

// =============================================================================
// GEMINI CLIENT
// =============================================================================
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeminiResponsePart {
    text: String,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, ComposeError> {
        // Generation routinely outlasts the 10s search budget, so the
        // total timeout is wider while the connect timeout stays tight.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<ModelOutput, ComposeError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, "Requesting completion");

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComposeError::Api { status, body });
        }

        let data: GeminiResponse = response.json().await?;
        let candidate = data.candidates.into_iter().next().ok_or(ComposeError::EmptyResponse)?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();

        // The invocation layer hands back the keyed-map shape; the raw
        // string shape stays supported for simpler backends.
        let mut map = Map::new();
        map.insert("text".to_string(), Value::String(text));
        Ok(ModelOutput::Structured(map))
    }
}

// =============================================================================
// EMAIL DRAFT TOOL
// =============================================================================
/// Formats the fixed instruction prompt and asks the model for the draft.
pub struct EmailDraftTool {
    model: Box<dyn CompletionModel>,
}

impl EmailDraftTool {
    pub fn new(model: Box<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// The fixed instruction prompt, with the research text delimited so
    /// the model can tell instructions from material.
    fn build_prompt(research: &str) -> String {
        format!(
            "You are an expert communication assistant. Using the research below, \
             compose a clear, engaging email (max 180 words) that summarises the key points \
             for a non-technical stakeholder. <research>{research}</research> Email:"
        )
    }

    /// Draft the email. Model errors propagate uncaught.
    pub async fn run(&self, research: &str) -> Result<String, ComposeError> {
        let prompt = Self::build_prompt(research);
        let output = self.model.complete(&prompt).await?;
        Ok(extract_text(output))
    }
}
